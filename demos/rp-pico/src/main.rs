//! Timer lamps on a Raspberry Pi Pico (BitDogLab wiring).
//!
//! - Button A on GPIO5 (active low, pull-up)
//! - RGB LED: blue GPIO12, red GPIO13, green GPIO11
//!
//! The falling-edge interrupt feeds the controller; hardware alarm 0 fires
//! the software alarm queue. The main loop only sleeps.

#![no_std]
#![no_main]

use core::cell::{Cell, RefCell};

use cortex_m::delay::Delay;
use critical_section::Mutex;
use fugit::MicrosDurationU32;
use panic_halt as _;
use rp_pico::entry;
use rp_pico::hal::gpio::bank0::{Gpio5, Gpio11, Gpio12, Gpio13};
use rp_pico::hal::gpio::{FunctionSioInput, FunctionSioOutput, Interrupt, Pin, PullDown, PullUp};
use rp_pico::hal::pac::{self, interrupt};
use rp_pico::hal::timer::{Alarm, Alarm0};
use rp_pico::hal::{Clock, Sio, Timer, clocks::init_clocks_and_plls, watchdog::Watchdog};
use rtt_target::{rprintln, rtt_init_print};

use rgb_lamp_timer::{
    AlarmQueue, BootMillis, ButtonLine, PinIndicator, ReactionController, TimeSource,
};

const BUTTON: ButtonLine = ButtonLine(5);
const IDLE_SLEEP_MS: u32 = 150;

type Blue = Pin<Gpio12, FunctionSioOutput, PullDown>;
type Red = Pin<Gpio13, FunctionSioOutput, PullDown>;
type Green = Pin<Gpio11, FunctionSioOutput, PullDown>;
type Button = Pin<Gpio5, FunctionSioInput, PullUp>;
type Lamps = PinIndicator<Blue, Red, Green>;

/// Milliseconds since boot read from the RP2040 64-bit timer.
struct BoardClock;

static TIMER: Mutex<Cell<Option<Timer>>> = Mutex::new(Cell::new(None));
static CLOCK: BoardClock = BoardClock;

impl TimeSource<BootMillis> for BoardClock {
    fn now(&self) -> BootMillis {
        critical_section::with(|cs| {
            TIMER
                .borrow(cs)
                .get()
                .map_or(BootMillis(0), |timer| {
                    BootMillis((timer.get_counter().ticks() / 1_000) as u32)
                })
        })
    }
}

/// Everything both interrupt handlers touch.
struct Board {
    controller: ReactionController<BootMillis, Lamps>,
    alarms: AlarmQueue<'static, BootMillis, BoardClock, 4>,
    alarm0: Alarm0,
    button: Button,
}

impl Board {
    /// Points hardware alarm 0 at the earliest pending software alarm.
    fn rearm(&mut self) {
        if let Some(wait) = self.alarms.time_until_next() {
            let millis = wait.0.max(1);
            if self.alarm0.schedule(MicrosDurationU32::millis(millis)).is_err() {
                rprintln!("alarm0: cannot schedule {} ms", millis);
            }
        }
    }
}

static BOARD: Mutex<RefCell<Option<Board>>> = Mutex::new(RefCell::new(None));

#[entry]
fn main() -> ! {
    rtt_init_print!();
    rprintln!("=== Timer Lamps ===");

    let mut pac = pac::Peripherals::take().unwrap();
    let core = pac::CorePeripherals::take().unwrap();

    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    let clocks = init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    let sio = Sio::new(pac.SIO);
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let mut alarm0 = timer.alarm_0().unwrap();
    alarm0.enable_interrupt();
    critical_section::with(|cs| TIMER.borrow(cs).set(Some(timer)));
    rprintln!("Timer configured");

    // Outputs start deasserted; the controller drives them low again on construction
    let indicator = PinIndicator::new(
        pins.gpio12.into_push_pull_output(),
        pins.gpio13.into_push_pull_output(),
        pins.gpio11.into_push_pull_output(),
        false,
    );
    rprintln!("RGB LED configured on GPIO12/13/11");

    let mut button: Button = pins.gpio5.into_pull_up_input();
    button.set_interrupt_enabled(Interrupt::EdgeLow, true);
    rprintln!("Button configured on GPIO5");

    critical_section::with(|cs| {
        BOARD.borrow(cs).replace(Some(Board {
            controller: ReactionController::new(BUTTON, indicator),
            alarms: AlarmQueue::new(&CLOCK),
            alarm0,
            button,
        }));
    });

    // SAFETY: handlers only touch state behind BOARD, which is initialized above
    unsafe {
        pac::NVIC::unmask(pac::Interrupt::IO_IRQ_BANK0);
        pac::NVIC::unmask(pac::Interrupt::TIMER_IRQ_0);
    }

    rprintln!("=== System Ready ===");

    let mut delay = Delay::new(core.SYST, clocks.system_clock.freq().to_Hz());
    loop {
        delay.delay_ms(IDLE_SLEEP_MS);
    }
}

#[interrupt]
fn IO_IRQ_BANK0() {
    critical_section::with(|cs| {
        let mut board = BOARD.borrow_ref_mut(cs);
        let Some(board) = board.as_mut() else {
            return;
        };

        if !board.button.interrupt_status(Interrupt::EdgeLow) {
            return;
        }
        board.button.clear_interrupt(Interrupt::EdgeLow);

        let line = ButtonLine(board.button.id().num);
        let outcome = board
            .controller
            .handle_edge(line, CLOCK.now(), &mut board.alarms);

        if outcome.is_accepted() {
            board.rearm();
        }
    });
}

#[interrupt]
fn TIMER_IRQ_0() {
    critical_section::with(|cs| {
        let mut board = BOARD.borrow_ref_mut(cs);
        let Some(board) = board.as_mut() else {
            return;
        };

        board.alarm0.clear_interrupt();
        board.controller.service_alarms(&mut board.alarms);
        board.rearm();
    });
}

//! Activity LED and buzzer on real pins.
//!
//! The LED is any infallible `embedded-hal` output pin; the buzzer is a passive piezo
//! driven by PWM0 at a fixed tone.

use core::convert::Infallible;

use embassy_nrf::peripherals::PWM0;
use embassy_nrf::pwm::SimplePwm;
use embedded_hal::digital::OutputPin;
use itag_finder::config::{BUZZER_DUTY_256, BUZZER_FREQUENCY_HZ, LED_ACTIVE_LOW};
use itag_finder::Outputs;

pub struct PinOutputs<P> {
    led: P,
    buzzer: SimplePwm<'static, PWM0>,
    duty_on: u16,
}

impl<P: OutputPin<Error = Infallible>> PinOutputs<P> {
    pub fn new(led: P, mut buzzer: SimplePwm<'static, PWM0>) -> Self {
        buzzer.set_period(BUZZER_FREQUENCY_HZ);
        let duty_on = (u32::from(buzzer.max_duty()) * u32::from(BUZZER_DUTY_256) / 256) as u16;
        let mut outputs = Self {
            led,
            buzzer,
            duty_on,
        };
        outputs.set_indicator(false);
        outputs.set_buzzer(false);
        outputs
    }
}

impl<P: OutputPin<Error = Infallible>> Outputs for PinOutputs<P> {
    fn set_indicator(&mut self, on: bool) {
        let result = if on != LED_ACTIVE_LOW {
            self.led.set_high()
        } else {
            self.led.set_low()
        };
        result.unwrap_or_else(|never| match never {});
    }

    fn set_buzzer(&mut self, on: bool) {
        self.buzzer
            .set_duty(0, if on { self.duty_on } else { 0 });
    }
}

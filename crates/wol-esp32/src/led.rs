//! Status LED.

use anyhow::Result;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, OutputPin, PinDriver};
use esp_idf_svc::hal::peripheral::Peripheral;
use wol_core::dispatcher::{BlinkPattern, Indicator};

/// Single LED blinking the request outcome. Blocks for the pattern's length.
pub struct Led {
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

impl Led {
    pub fn new(pin: impl Peripheral<P = impl OutputPin> + 'static) -> Result<Self> {
        let mut pin = PinDriver::output(pin.into_ref().map_into::<AnyOutputPin>())?;
        pin.set_low()?;
        Ok(Self { pin })
    }
}

impl Indicator for Led {
    fn blink(&mut self, pattern: BlinkPattern) {
        let (flashes, on_ms, off_ms) = pattern.timing();
        for _ in 0..flashes {
            let _ = self.pin.set_high();
            FreeRtos::delay_ms(on_ms);
            let _ = self.pin.set_low();
            FreeRtos::delay_ms(off_ms);
        }
    }
}

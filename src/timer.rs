

/// Timer trait provides mechanisms for accessing monotonic times
/// to assist with procotol implementations.
///
/// All methods are monotonic and relative to the same unknown epoc
pub trait Timer {
    /// Returns the number of millisecond ticks since some unknown epoc
    fn ticks_ms(&self) -> u32;

    /// Returns the microsecond ticks since some unknown epoc
    fn time_us(&self) -> u32;
}

#[cfg(any(test, feature = "mocks"))]
pub mod mock {
    use core::cell::Cell;

    /// A clock for tests. Advances explicitly via `advance_ms`/`set_ms`,
    /// and optionally auto-advances by `auto_step_ms` on every read, so a
    /// blocking busy-wait loop driven purely by repeated `ticks_ms()`
    /// calls (as in `Network`'s end-to-end ACK wait) makes forward
    /// progress in a test without a real clock behind it.
    #[derive(Debug)]
    pub struct MockTimer {
        now: Cell<u64>,
        auto_step_ms: u64,
    }

    impl MockTimer {
        pub fn new() -> Self {
            MockTimer {
                now: Cell::new(0),
                auto_step_ms: 0,
            }
        }

        /// A timer that advances by `step_ms` every time it is read,
        /// useful for exercising timeout paths without manual stepping.
        pub fn auto_advancing(step_ms: u64) -> Self {
            MockTimer {
                now: Cell::new(0),
                auto_step_ms: step_ms,
            }
        }

        pub fn set_ms(&mut self, ms: u64) {
            self.now.set(ms);
        }

        pub fn advance_ms(&mut self, ms: u64) {
            self.now.set(self.now.get() + ms);
        }
    }

    impl Default for MockTimer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl super::Timer for MockTimer {
        fn ticks_ms(&self) -> u32 {
            let value = self.now.get();
            if self.auto_step_ms != 0 {
                self.now.set(value + self.auto_step_ms);
            }
            value as u32
        }

        fn time_us(&self) -> u32 {
            (self.now.get() * 1000) as u32
        }
    }
}

//! Best-effort progress reporting. `tick()` carries no semantic weight; a
//! ticker that drops events under load is still a correct ticker.

pub trait ProgressTicker {
    fn tick(&mut self);
}

/// Default ticker: does nothing.
#[derive(Default)]
pub struct NullTicker;

impl ProgressTicker for NullTicker {
    fn tick(&mut self) {}
}

impl<T: ProgressTicker + ?Sized> ProgressTicker for &mut T {
    fn tick(&mut self) {
        (**self).tick();
    }
}

//! Scoped interrupt masking.

use core::marker::PhantomData;

use critical_section::RestoreState;

/// Masks interrupts from construction until drop.
///
/// Operations that must not race an interrupt handler take `&InterruptGuard`
/// as proof that the caller holds the mask, e.g.
/// [`EncoderDecoder::take_delta`](crate::encoder::EncoderDecoder::take_delta).
///
/// Guards nest: drop them in the reverse order of acquisition, which scoped
/// locals do on their own.
pub struct InterruptGuard {
    restore: RestoreState,
    // Must be released on the context that acquired it.
    _not_send: PhantomData<*mut ()>,
}

impl InterruptGuard {
    /// Masks interrupts.
    #[must_use = "interrupts are unmasked again as soon as the guard is dropped"]
    pub fn acquire() -> Self {
        // SAFETY: paired with exactly one `release` in `Drop`; the guard is
        // `!Send`, so release happens on the acquiring context.
        let restore = unsafe { critical_section::acquire() };
        Self {
            restore,
            _not_send: PhantomData,
        }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        // SAFETY: `restore` came from the matching `acquire` in `acquire()`.
        unsafe { critical_section::release(self.restore) };
    }
}

// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Execution contexts and critical sections.
//!
//! The system has exactly two execution contexts:
//! the `main()` loop, which runs with interrupts enabled,
//! and the interrupt handlers, which run to completion with interrupts masked.
//!
//! [MainCtx] and [IrqCtx] are zero sized proofs of the context that is running.
//! State that is only ever touched from `main()` lives in a [MutexCell].
//! State that is shared with an interrupt handler lives in a [Mutex]
//! and is accessed from `main()` only through [free].

use core::{cell::Cell, cell::UnsafeCell, marker::PhantomData, mem::MaybeUninit};
use critical_section::RestoreState;

pub use critical_section::{CriticalSection, Mutex};

macro_rules! define_context {
    ($name:ident) => {
        pub struct $name<'cs>(CriticalSection<'cs>);

        impl<'cs> $name<'cs> {
            /// Create a new context.
            ///
            /// # SAFETY
            ///
            /// This may only be called from the corresponding context.
            /// `MainCtx` may only be constructed from `main()`
            /// and `IrqCtx` may only be constructed from ISRs.
            #[inline(always)]
            pub unsafe fn new() -> Self {
                // SAFETY: In interrupt context the interrupts are masked by hardware,
                //         so this cs is real.
                //         In main context the cs is only used with `MutexCell`,
                //         which is never accessed from interrupt context.
                //         Everything shared with an ISR goes through `free()`.
                let cs = unsafe { CriticalSection::new() };
                fence();
                Self(cs)
            }

            /// Get the `CriticalSection` that belongs to this context.
            #[inline(always)]
            pub fn cs(&self) -> CriticalSection<'cs> {
                self.0
            }
        }

        impl<'cs> Drop for $name<'cs> {
            #[inline(always)]
            fn drop(&mut self) {
                fence();
            }
        }
    };
}

define_context!(MainCtx);
define_context!(IrqCtx);

/// Main context initialization marker.
///
/// This marker does not have a pub constructor.
/// It is only created by [MainCtx::new_with_init].
pub struct MainInitCtx(());

impl MainInitCtx {
    /// Interrupts are still disabled during initialization.
    #[inline(always)]
    pub fn cs(&self) -> CriticalSection<'_> {
        // SAFETY: The init closure runs before interrupts are enabled.
        unsafe { CriticalSection::new() }
    }
}

impl<'cs> MainCtx<'cs> {
    /// Run the static initializer `f` and then create the main context.
    ///
    /// # SAFETY
    ///
    /// The safety contract of [MainCtx::new] must be upheld
    /// and interrupts must still be disabled.
    #[inline(always)]
    pub unsafe fn new_with_init<F: FnOnce(&MainInitCtx)>(f: F) -> Self {
        f(&MainInitCtx(()));
        // SAFETY: Safety contract of MainCtx::new is upheld by the caller.
        unsafe { Self::new() }
    }
}

/// Lazy initialization of static variables.
pub struct LazyMainInit<T>(UnsafeCell<MaybeUninit<T>>);

impl<T> LazyMainInit<T> {
    /// # SAFETY
    ///
    /// It must be ensured that the returned instance is initialized
    /// with a call to [Self::init] during construction of the [MainCtx].
    /// See [MainCtx::new_with_init].
    ///
    /// Using this object in any way before initializing it will
    /// result in Undefined Behavior.
    #[inline(always)]
    pub const unsafe fn uninit() -> Self {
        Self(UnsafeCell::new(MaybeUninit::uninit()))
    }

    #[inline(always)]
    pub fn init(&self, _m: &MainInitCtx, inner: T) {
        // SAFETY: Initialization is required for the `assume_init` calls.
        //         Interrupts are disabled during init, so there is no concurrent reader.
        unsafe { *self.0.get() = MaybeUninit::new(inner) };
    }

    #[inline(always)]
    pub fn deref(&self, _m: &MainCtx) -> &T {
        // SAFETY: the `Self::uninit` safety contract ensures that `Self::init` is called before us.
        unsafe { (*self.0.get()).assume_init_ref() }
    }
}

// SAFETY: If T is Send, then we can Send the whole object. The object only contains T state.
unsafe impl<T: Send> Send for LazyMainInit<T> {}

// SAFETY: The `deref` function ensures that it can only be called
//         from `MainCtx` compatible contexts.
unsafe impl<T> Sync for LazyMainInit<T> {}

/// Optimization and reordering fence.
#[inline(always)]
pub fn fence() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Interrupt lock.
///
/// Creating the guard saves the global interrupt enable state and disables interrupts.
/// Dropping it restores exactly the saved state.
/// An inner guard therefore leaves interrupts disabled for the enclosing one.
pub struct IrqGuard {
    restore: RestoreState,
    _not_send: PhantomData<*mut ()>,
}

impl IrqGuard {
    /// Disable interrupts.
    ///
    /// # SAFETY
    ///
    /// Guards must be dropped in reverse order of their creation
    /// and must not be leaked.
    /// Use [free] unless you need the guard itself.
    #[inline(always)]
    pub unsafe fn new() -> Self {
        // SAFETY: The matching release happens in drop().
        //         Ordering is guaranteed by our caller.
        let restore = unsafe { critical_section::acquire() };
        fence();
        Self {
            restore,
            _not_send: PhantomData,
        }
    }

    #[inline(always)]
    pub fn cs(&self) -> CriticalSection<'_> {
        // SAFETY: Interrupts are disabled for the lifetime of self.
        unsafe { CriticalSection::new() }
    }
}

impl Drop for IrqGuard {
    #[inline(always)]
    fn drop(&mut self) {
        fence();
        // SAFETY: self.restore was returned by the matching acquire() in new().
        unsafe { critical_section::release(self.restore) };
    }
}

/// Run `f` with interrupts disabled.
///
/// The previous interrupt state is restored on every way out of `f`,
/// so calls can be nested freely.
#[inline(always)]
pub fn free<R>(f: impl FnOnce(CriticalSection<'_>) -> R) -> R {
    // SAFETY: The guard is dropped at the end of this scope,
    //         after all guards created inside of `f`.
    let guard = unsafe { IrqGuard::new() };
    f(guard.cs())
}

/// Cell that is only accessible from the main context.
pub struct MutexCell<T> {
    inner: Mutex<Cell<T>>,
}

impl<T> MutexCell<T> {
    #[inline]
    pub const fn new(inner: T) -> Self {
        Self {
            inner: Mutex::new(Cell::new(inner)),
        }
    }

    #[inline]
    pub fn replace(&self, m: &MainCtx<'_>, inner: T) -> T {
        self.inner.borrow(m.cs()).replace(inner)
    }
}

impl<T: Copy> MutexCell<T> {
    #[inline]
    pub fn get(&self, m: &MainCtx<'_>) -> T {
        self.inner.borrow(m.cs()).get()
    }

    #[inline]
    pub fn set(&self, m: &MainCtx<'_>, inner: T) {
        self.inner.borrow(m.cs()).set(inner);
    }
}


// vim: ts=4 sw=4 expandtab

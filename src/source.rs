//! Value sources: live variables that render themselves on demand.

use std::fmt::Display;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Trait for variables that can render their current value as a string
///
/// The publisher never inspects the numeric type; whatever `render` returns
/// is normalised by the formatter and written to the wire. Implementations
/// are shared between the registering caller and the publish loop, so they
/// must be internally synchronised.
pub trait ValueSource: Send + Sync + 'static {
    /// Render the current value
    fn render(&self) -> String;
}

/// An integer variable backed by an atomic
#[derive(Debug, Default)]
pub struct IntVar {
    value: AtomicI64,
}

impl IntVar {
    /// Create a new integer variable starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current value
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Add a delta to the current value
    pub fn add(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl ValueSource for IntVar {
    fn render(&self) -> String {
        self.get().to_string()
    }
}

/// A floating-point variable, stored as raw bits in an atomic
#[derive(Debug, Default)]
pub struct FloatVar {
    bits: AtomicU64,
}

impl FloatVar {
    /// Create a new float variable starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current value
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Add a delta to the current value
    pub fn add(&self, delta: f64) {
        // Compare-and-swap loop over the bit representation
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Get the current value
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl ValueSource for FloatVar {
    fn render(&self) -> String {
        self.get().to_string()
    }
}

/// A variable computed by a closure each time it is published
pub struct FuncVar {
    func: Box<dyn Fn() -> String + Send + Sync>,
}

impl FuncVar {
    /// Create a variable from a closure returning the rendered value
    pub fn new<F, V>(func: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Display,
    {
        Self {
            func: Box::new(move || func().to_string()),
        }
    }
}

impl ValueSource for FuncVar {
    fn render(&self) -> String {
        (self.func)()
    }
}

//! Logging shim.
//!
//! Trace lines forward to `defmt::trace!` when the `defmt` feature is
//! enabled and compile to nothing otherwise, so host builds link without a
//! global logger. Arguments are still evaluated with the feature disabled,
//! keeping side effects and type checking identical across both builds.

#[cfg(feature = "defmt")]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::defmt::trace!($s $(, $x)*)
    };
}

#[cfg(not(feature = "defmt"))]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($( & $x ),*);
    }};
}

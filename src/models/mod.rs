//! Nonlinear model forms.
//!
//! Models are small value types behind the `ModelForm` trait so that the
//! solver and bootstrap code can stay generic.

pub mod logistic;

pub use logistic::*;

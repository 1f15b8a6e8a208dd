pub mod fractal;

pub use fractal::PivotLocator;

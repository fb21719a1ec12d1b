mod tar;

pub use tar::*;

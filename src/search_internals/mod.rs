pub mod armor;
pub mod branch_opt_util;
pub mod chain;
pub mod compare;
pub mod error;
pub mod params;
pub mod reduce;
pub mod scan;

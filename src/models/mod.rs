pub mod calculation;
pub mod user;

pub use calculation::{
    Calculation, CalculationFilter, CalculationPatch, CalculationRow, NewCalculation,
};
pub use user::{NewUser, User};

// Product sources backed by real remote databases
pub mod openfoodfacts;

pub use openfoodfacts::OpenFoodFactsSource;

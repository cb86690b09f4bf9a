pub mod counter;
pub mod extract;
pub mod normalize;
pub mod summary;
pub mod table;

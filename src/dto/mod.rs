/// Ranking table projections.
pub mod ranking;
/// Selectable reference options (patents, map types, players).
pub mod reference;

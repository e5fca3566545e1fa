// Draft data model: player pool, picks, board, snake order.

pub mod board;
pub mod order;
pub mod pick;
pub mod player;

pub mod config;
pub mod elo;
pub mod export;
pub mod features;
pub mod form;
pub mod h2h;
pub mod live;
pub mod match_log;
pub mod match_store;
pub mod rankings;
pub mod replay;

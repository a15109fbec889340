pub mod leaderboard;
pub mod transport;

//! Command line / environment configuration for the server binary.

use std::time::Duration;

use clap::Parser;

use crate::{domain::round, usecase::CoordinatorConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "kupid-server")]
#[command(about = "Matchmaking and WebRTC signaling server for two-person video rooms", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "KUPID_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "KUPID_PORT", default_value_t = 3000)]
    pub port: u16,

    /// How long a matched room stays on the main stage (seconds)
    #[arg(long, env = "KUPID_MAIN_STAGE_SECS", default_value_t = 480)]
    pub main_stage_secs: u64,

    /// Number of prompt rounds per session
    #[arg(long, env = "KUPID_ROUNDS_PER_SESSION", default_value_t = 3)]
    pub rounds_per_session: usize,

    /// Round length (seconds) for prompts without their own duration
    #[arg(long, env = "KUPID_ROUND_BASE_DURATION", default_value_t = 60)]
    pub round_base_duration: u64,

    /// Shuffle the prompt catalogue before each session
    #[arg(
        long,
        env = "KUPID_RANDOMIZE_PROMPTS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub randomize_prompts: bool,

    /// Re-run matchmaking whenever a participant leaves a room
    #[arg(
        long,
        env = "KUPID_PROMOTE_ON_PARTICIPANT_LEAVE",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub promote_on_participant_leave: bool,
}

impl ServerConfig {
    /// Coordinator 用の設定へ変換
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            main_stage_duration: Duration::from_secs(self.main_stage_secs),
            rounds_per_session: self.rounds_per_session,
            round_base_duration_secs: self.round_base_duration,
            randomize_prompts: self.randomize_prompts,
            promote_on_participant_leave: self.promote_on_participant_leave,
            catalogue: round::catalogue(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // テスト項目: 引数なしで既定値が使われる
        // given (前提条件):
        let args = ["kupid-server"];

        // when (操作):
        let config = ServerConfig::try_parse_from(args).unwrap();

        // then (期待する結果):
        assert_eq!(config.port, 3000);
        assert_eq!(config.main_stage_secs, 480);
        assert!(config.randomize_prompts);
        assert!(!config.promote_on_participant_leave);
    }

    #[test]
    fn test_coordinator_config_from_flags() {
        // テスト項目: フラグの値が CoordinatorConfig に反映される
        // given (前提条件):
        let args = [
            "kupid-server",
            "--main-stage-secs",
            "10",
            "--rounds-per-session",
            "2",
            "--randomize-prompts",
            "false",
            "--promote-on-participant-leave",
            "true",
        ];

        // when (操作):
        let config = ServerConfig::try_parse_from(args)
            .unwrap()
            .coordinator_config();

        // then (期待する結果):
        assert_eq!(config.main_stage_duration, Duration::from_secs(10));
        assert_eq!(config.rounds_per_session, 2);
        assert!(!config.randomize_prompts);
        assert!(config.promote_on_participant_leave);
        assert_eq!(config.catalogue.len(), round::catalogue().len());
    }
}

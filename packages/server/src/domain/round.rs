//! Round prompts
//!
//! ラウンド（時間制限付きのお題）のカタログと、セッションごとのお題選択。

use rand::seq::SliceRandom;

/// ラウンドのお題
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPrompt {
    pub title: String,
    pub prompt: String,
    /// 0 の場合は設定のベース時間を使う
    pub duration_secs: u64,
}

impl RoundPrompt {
    pub fn new(title: &str, prompt: &str, duration_secs: u64) -> Self {
        Self {
            title: title.to_string(),
            prompt: prompt.to_string(),
            duration_secs,
        }
    }

    /// 実際に使う制限時間（秒）
    pub fn effective_duration_secs(&self, base_duration_secs: u64) -> u64 {
        if self.duration_secs == 0 {
            base_duration_secs
        } else {
            self.duration_secs
        }
    }
}

/// 組み込みのお題カタログ
pub fn catalogue() -> Vec<RoundPrompt> {
    vec![
        RoundPrompt::new("Round 1 · Icebreaker", "Two truths and a lie. Go!", 60),
        RoundPrompt::new(
            "Round 1 · Quick Fire",
            "What's your most chaotic midnight snack?",
            45,
        ),
        RoundPrompt::new(
            "Round 1 · Energy Check",
            "Show us your best dance move in 3 seconds!",
            30,
        ),
        RoundPrompt::new(
            "Round 2 · Personality",
            "Describe your perfect chaotic weekend in 15 seconds.",
            60,
        ),
        RoundPrompt::new(
            "Round 2 · Hot Takes",
            "Pineapple on pizza: defend your stance!",
            45,
        ),
        RoundPrompt::new(
            "Round 2 · Vibes Only",
            "What's your most ick-worthy habit? (Keep it PG!)",
            45,
        ),
        RoundPrompt::new(
            "Round 3 · Connection",
            "What's the weirdest thing you've ever googled?",
            60,
        ),
        RoundPrompt::new(
            "Round 3 · Future Plans",
            "Describe your dream date in exactly 10 words.",
            45,
        ),
        RoundPrompt::new(
            "Round 3 · Truth Time",
            "What's your biggest red flag? (Be honest!)",
            60,
        ),
        RoundPrompt::new(
            "Round 4 · Wild Card",
            "Act out your favorite movie scene in 20 seconds!",
            60,
        ),
        RoundPrompt::new(
            "Round 4 · Speed Round",
            "Answer these 5 questions in 30 seconds: 1) Coffee or tea? 2) Beach or mountains? 3) Morning or night? 4) Sweet or savory? 5) Introvert or extrovert?",
            45,
        ),
        RoundPrompt::new(
            "Round 4 · Final Question",
            "What's one thing you'd change about dating apps?",
            60,
        ),
    ]
}

/// セッションで使うお題の列を選ぶ
///
/// # Arguments
///
/// * `catalogue` - 選択元のお題
/// * `count` - 選ぶ数（カタログより多い場合はカタログ全体）
/// * `randomize` - `true` ならシャッフルしてから先頭を取る、`false` ならカタログ順
pub fn select_rounds(catalogue: &[RoundPrompt], count: usize, randomize: bool) -> Vec<RoundPrompt> {
    let mut rounds = catalogue.to_vec();
    if randomize {
        rounds.shuffle(&mut rand::rng());
    }
    rounds.truncate(count);
    rounds
}

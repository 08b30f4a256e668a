//! User-facing notification texts in English and Japanese.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ja" => Ok(Self::Ja),
            other => Err(format!("unsupported locale '{other}' (expected en or ja)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Initiated,
    Processed,
    Failure,
    Difference,
    AuthenticationError,
    QueryError,
    UpdateError,
    PageLoadError,
    ElementParseError,
    ScrapeError,
    BrowserCrash,
    CsvPreparationError,
    CsvSaveError,
}

impl Locale {
    pub fn text(self, message: Message) -> &'static str {
        match self {
            Self::En => english(message),
            Self::Ja => japanese(message),
        }
    }
}

fn english(message: Message) -> &'static str {
    match message {
        Message::Initiated => "Trailblazer status sync started.",
        Message::Processed => "Trailblazer status sync processed.",
        Message::Failure => "Failure",
        Message::Difference => "Badge changes",
        Message::AuthenticationError => "Failed to authenticate with Salesforce.",
        Message::QueryError => "Failed to query Salesforce.",
        Message::UpdateError => "Failed to update records in Salesforce.",
        Message::PageLoadError => "Failed to load the profile page.",
        Message::ElementParseError => "Failed to read the status element.",
        Message::ScrapeError => "Failed to scrape profile data.",
        Message::BrowserCrash => "The headless browser crashed.",
        Message::CsvPreparationError => "Failed to prepare the CSV export.",
        Message::CsvSaveError => "Failed to save the CSV export.",
    }
}

fn japanese(message: Message) -> &'static str {
    match message {
        Message::Initiated => "Trailblazer ステータスの同期を開始しました。",
        Message::Processed => "Trailblazer ステータスの同期が完了しました。",
        Message::Failure => "失敗",
        Message::Difference => "バッジの変化",
        Message::AuthenticationError => "Salesforce の認証に失敗しました。",
        Message::QueryError => "Salesforce のクエリに失敗しました。",
        Message::UpdateError => "Salesforce のレコード更新に失敗しました。",
        Message::PageLoadError => "プロフィールページの読み込みに失敗しました。",
        Message::ElementParseError => "ステータス要素の取得に失敗しました。",
        Message::ScrapeError => "プロフィールデータの取得に失敗しました。",
        Message::BrowserCrash => "ヘッドレスブラウザがクラッシュしました。",
        Message::CsvPreparationError => "CSV の作成に失敗しました。",
        Message::CsvSaveError => "CSV の保存に失敗しました。",
    }
}

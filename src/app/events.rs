use crate::session::TranslationTicket;
use crate::translate::TranslateError;

#[derive(Debug)]
pub enum Event {
    Input(InputEvent),
    Player(PlayerEvent),
    Translation(TranslationEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Started,
    Paused,
    Position { seconds: f64 },
    Duration { seconds: f64 },
    Ended,
    Error(String),
}

#[derive(Debug)]
pub struct TranslationEvent {
    pub ticket: TranslationTicket,
    pub result: Result<String, TranslateError>,
}

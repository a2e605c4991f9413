/// Scroll scenarios
///
/// Builds a synthetic feed, replays a scroll script through a `FeedSession`
/// and records what the coordinator did.
use crate::error::{Result, SimError};
use crate::player::{PlayerLog, PlayerStats, SimulatedFactory};
use reel_core::{ActiveCard, Card, CardId, CardGeometry};
use reel_playback::{
    CoordinatorEvent, FeedConfig, FeedSession, SessionSummary, TriggerMode, ViewabilityChange,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::info;

/// Evenly spaced cards of equal height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedLayout {
    pub cards: u64,
    pub card_height: f64,
    pub gap: f64,
}

impl Default for FeedLayout {
    fn default() -> Self {
        Self {
            cards: 5,
            card_height: 500.0,
            gap: 100.0,
        }
    }
}

impl FeedLayout {
    pub fn geometry(&self, index: u64) -> CardGeometry {
        CardGeometry::new(index as f64 * (self.card_height + self.gap), self.card_height)
    }

    pub fn card(&self, index: u64) -> Card {
        Card::new(
            CardId::new(index),
            format!("feed/clip-{:03}.mp4", index),
            format!("Clip #{}", index + 1),
        )
    }

    /// Cards intersecting the viewport at `offset`
    fn viewability(&self, offset: f64, viewport_height: f64) -> Vec<ViewabilityChange> {
        (0..self.cards)
            .map(|index| {
                let geometry = self.geometry(index);
                let visible = geometry.top < offset + viewport_height && geometry.bottom() > offset;
                ViewabilityChange::new(CardId::new(index), visible)
            })
            .collect()
    }
}

/// Scroll offsets replayed one per step
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollScript {
    pub offsets: Vec<f64>,
    pub step: Duration,
}

/// One change of the active card during a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub at_ms: u64,
    pub previous: ActiveCard,
    pub current: ActiveCard,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct SimReport {
    pub transitions: Vec<Transition>,
    pub events: Vec<CoordinatorEvent>,
    pub summary: SessionSummary,
    pub players: BTreeMap<CardId, PlayerStats>,
}

/// Replay `script` over `layout` and shut the feed down
pub async fn run(
    config: FeedConfig,
    layout: &FeedLayout,
    script: &ScrollScript,
    factory: SimulatedFactory,
    log: &PlayerLog,
) -> Result<SimReport> {
    let viewport_height = config.viewport_height;
    let trigger = config.trigger;

    let mut session = FeedSession::spawn(config, factory)?;
    let mut events = session
        .take_events()
        .ok_or_else(|| SimError::Config("event stream already taken".to_string()))?;
    let feed = session.handle();

    for index in 0..layout.cards {
        feed.mount(layout.card(index)).await?;
        let geometry = layout.geometry(index);
        feed.layout(CardId::new(index), geometry.top, geometry.height)?;
    }
    info!("Mounted {} cards", layout.cards);

    let started = Instant::now();
    let mut report = Recording::default();

    for &offset in &script.offsets {
        feed.scroll(offset);
        if trigger == TriggerMode::Viewability {
            feed.viewability(layout.viewability(offset, viewport_height))?;
        }

        tokio::time::sleep(script.step).await;
        report.collect(&mut events, started);
    }

    let summary = session.shutdown().await?;
    report.collect(&mut events, started);

    Ok(SimReport {
        transitions: report.transitions,
        events: report.events,
        summary,
        players: log.snapshot(),
    })
}

#[derive(Default)]
struct Recording {
    transitions: Vec<Transition>,
    events: Vec<CoordinatorEvent>,
}

impl Recording {
    fn collect(&mut self, events: &mut UnboundedReceiver<CoordinatorEvent>, started: Instant) {
        while let Ok(event) = events.try_recv() {
            if let CoordinatorEvent::ActiveChanged { previous, current } = &event {
                self.transitions.push(Transition {
                    at_ms: started.elapsed().as_millis() as u64,
                    previous: *previous,
                    current: *current,
                });
            }
            self.events.push(event);
        }
    }
}

/// Parse `0,650,1300`
pub fn parse_offsets(input: &str) -> Result<Vec<f64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .ok()
                .filter(|offset| offset.is_finite())
                .ok_or_else(|| SimError::invalid_argument(format!("bad scroll offset '{}'", part)))
        })
        .collect()
}

/// Parse `0=0.8,1=0.4` into visible fractions per card
pub fn parse_fractions(input: &str) -> Result<BTreeMap<CardId, f64>> {
    let mut fractions = BTreeMap::new();

    for part in input.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let (card, fraction) = part
            .split_once('=')
            .ok_or_else(|| SimError::invalid_argument(format!("expected CARD=FRACTION, got '{}'", part)))?;

        let card = card
            .trim()
            .parse::<u64>()
            .map_err(|_| SimError::invalid_argument(format!("bad card id '{}'", card)))?;
        let fraction = fraction
            .trim()
            .parse::<f64>()
            .map_err(|_| SimError::invalid_argument(format!("bad fraction '{}'", fraction)))?;

        fractions.insert(CardId::new(card), fraction);
    }

    Ok(fractions)
}

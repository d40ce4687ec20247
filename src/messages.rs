//! Tutorial text tied to how far down the hallway the player is.
//!
//! Zones are ranges of the player's Z coordinate. Walking into one shows its
//! message; a zone can ask for its message to appear after a delay instead,
//! and that delayed message is dropped if the player walks out first.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{config::GameConfig, player::Player, GameSet};

pub struct MessagesPlugin;

impl Plugin for MessagesPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_message_board).add_systems(
            Update,
            message_board_system
                .in_set(GameSet::Simulation)
                .run_if(resource_exists::<MessageBoard>),
        );
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageZone {
    pub message: String,
    pub start_z: f32,
    pub end_z: f32,
    /// Show the message this long after entering, the first time only.
    #[serde(default)]
    pub delay_secs: Option<f32>,
}

impl MessageZone {
    /// Half-open: `start_z` belongs to the zone, `end_z` to whatever follows.
    pub fn contains(&self, z: f32) -> bool {
        self.start_z <= z && z < self.end_z
    }
}

/// Inclusive range of Z.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ZRange {
    pub start_z: f32,
    pub end_z: f32,
}

impl ZRange {
    pub fn contains(&self, z: f32) -> bool {
        self.start_z <= z && z <= self.end_z
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MessageSettings {
    /// Only the tutorial level talks to the player.
    pub enabled: bool,
    pub zones: Vec<MessageZone>,
    /// Where the "how to flip gravity" panel is up.
    pub gravity_hint: Option<ZRange>,
}

/// Logs every zone whose bounds are reversed. The zones are kept as they are;
/// a reversed zone simply never matches.
pub fn validate_zones(zones: &[MessageZone]) -> usize {
    let mut invalid = 0;
    for zone in zones.iter().filter(|zone| zone.start_z > zone.end_z) {
        warn!(
            "Message zone {:?} has start_z {} > end_z {}",
            zone.message, zone.start_z, zone.end_z
        );
        invalid += 1;
    }
    invalid
}

/// What the HUD should do with the message panel.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum MessageCommand {
    Show(String),
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingMessage {
    zone: usize,
    due: f32,
}

#[derive(Resource, Debug, Clone)]
pub struct MessageBoard {
    settings: MessageSettings,
    /// Zone whose message is on screen.
    current: Option<usize>,
    pending: Option<PendingMessage>,
    /// A delayed message has been shown since the player was last outside
    /// every zone. Delays only apply the first time.
    delayed_shown: bool,
    hint_visible: bool,
}

impl MessageBoard {
    pub fn new(settings: MessageSettings) -> Self {
        Self {
            settings,
            current: None,
            pending: None,
            delayed_shown: false,
            hint_visible: false,
        }
    }

    /// Index of the first zone containing `z`.
    pub fn zone_at(&self, z: f32) -> Option<usize> {
        self.settings.zones.iter().position(|zone| zone.contains(z))
    }

    pub fn current_message(&self) -> Option<&str> {
        self.current
            .map(|index| self.settings.zones[index].message.as_str())
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    pub fn gravity_hint_visible(&self, z: f32) -> bool {
        self.settings.enabled
            && self
                .settings
                .gravity_hint
                .is_some_and(|range| range.contains(z))
    }

    /// Feeds the player's Z at time `now` and returns what the message panel
    /// should change to, if anything.
    pub fn update(&mut self, z: f32, now: f32) -> Option<MessageCommand> {
        if !self.settings.enabled {
            return None;
        }
        self.hint_visible = self.gravity_hint_visible(z);

        let zone = self.zone_at(z);

        if let Some(pending) = self.pending {
            if zone != Some(pending.zone) {
                debug!("Player left zone {} before its message was due", pending.zone);
                self.pending = None;
            } else if now >= pending.due {
                self.pending = None;
                self.delayed_shown = true;
                return Some(self.show(pending.zone));
            } else {
                return None;
            }
        }

        if zone == self.current {
            return None;
        }

        let Some(index) = zone else {
            self.current = None;
            self.delayed_shown = false;
            return Some(MessageCommand::Hide);
        };

        match self.settings.zones[index].delay_secs {
            Some(delay) if !self.delayed_shown => {
                self.pending = Some(PendingMessage {
                    zone: index,
                    due: now + delay,
                });
                None
            }
            _ => Some(self.show(index)),
        }
    }

    fn show(&mut self, index: usize) -> MessageCommand {
        self.current = Some(index);
        MessageCommand::Show(self.settings.zones[index].message.clone())
    }
}

fn setup_message_board(mut commands: Commands, config: Res<GameConfig>) {
    commands.insert_resource(MessageBoard::new(config.messages.clone()));
}

fn message_board_system(
    mut commands: Commands,
    time: Res<Time>,
    mut board: ResMut<MessageBoard>,
    player: Query<&Transform, With<Player>>,
) {
    let Ok(player_transform) = player.single() else {
        return;
    };

    // Only flag the resource when something changes, so `is_changed` means
    // something to the HUD.
    let hint_before = board.hint_visible;
    let command = board
        .bypass_change_detection()
        .update(player_transform.translation.z, time.elapsed_secs());
    if command.is_some() || board.hint_visible != hint_before {
        board.set_changed();
    }

    if let Some(command) = command {
        commands.trigger(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(message: &str, start_z: f32, end_z: f32, delay_secs: Option<f32>) -> MessageZone {
        MessageZone {
            message: message.to_string(),
            start_z,
            end_z,
            delay_secs,
        }
    }

    fn board(zones: Vec<MessageZone>) -> MessageBoard {
        MessageBoard::new(MessageSettings {
            enabled: true,
            zones,
            gravity_hint: Some(ZRange {
                start_z: -40.0,
                end_z: -20.0,
            }),
        })
    }

    fn show(message: &str) -> Option<MessageCommand> {
        Some(MessageCommand::Show(message.to_string()))
    }

    #[test]
    fn sweeping_two_adjacent_zones() {
        let mut board = board(vec![zone("A", 0.0, 10.0, None), zone("B", 10.0, 20.0, None)]);

        assert_eq!(board.update(-1.0, 0.0), None);
        assert_eq!(board.update(0.0, 0.1), show("A"));
        assert_eq!(board.update(9.99, 0.2), None);
        assert_eq!(board.update(10.0, 0.3), show("B"));
        assert_eq!(board.update(19.99, 0.4), None);
        assert_eq!(board.update(20.0, 0.5), Some(MessageCommand::Hide));
        assert_eq!(board.update(25.0, 0.6), None);
        assert_eq!(board.current_message(), None);
    }

    #[test]
    fn first_matching_zone_wins() {
        let board = board(vec![zone("A", 0.0, 10.0, None), zone("B", 5.0, 15.0, None)]);
        assert_eq!(board.zone_at(7.0), Some(0));
        assert_eq!(board.zone_at(12.0), Some(1));
    }

    #[test]
    fn delayed_message_waits() {
        let mut board = board(vec![zone("Late", -100.0, -80.0, Some(1.5))]);

        assert_eq!(board.update(-90.0, 10.0), None);
        assert!(board.has_pending());
        assert_eq!(board.update(-91.0, 11.0), None);
        assert_eq!(board.update(-92.0, 11.5), show("Late"));
        assert!(!board.has_pending());
        assert_eq!(board.update(-93.0, 12.0), None);
    }

    #[test]
    fn leaving_cancels_a_delayed_message() {
        let mut board = board(vec![
            zone("Before", -80.0, -60.0, None),
            zone("Late", -100.0, -80.0, Some(1.5)),
        ]);

        assert_eq!(board.update(-70.0, 0.0), show("Before"));
        assert_eq!(board.update(-85.0, 1.0), None);
        assert!(board.has_pending());

        // Back before the delay ran out: the late message never appears.
        assert_eq!(board.update(-70.0, 1.2), None);
        assert!(!board.has_pending());
        assert_eq!(board.current_message(), Some("Before"));
        assert_eq!(board.update(-70.0, 5.0), None);
    }

    #[test]
    fn delay_only_applies_once_per_visit() {
        let mut board = board(vec![
            zone("Late", -100.0, -80.0, Some(1.5)),
            zone("Next", -120.0, -100.0, None),
        ]);

        board.update(-90.0, 0.0);
        assert_eq!(board.update(-90.0, 2.0), show("Late"));
        assert_eq!(board.update(-110.0, 3.0), show("Next"));
        // Still inside the zones: the late message comes back immediately.
        assert_eq!(board.update(-90.0, 4.0), show("Late"));

        // Out of every zone resets it.
        assert_eq!(board.update(0.0, 5.0), Some(MessageCommand::Hide));
        assert_eq!(board.update(-90.0, 6.0), None);
        assert!(board.has_pending());
    }

    #[test]
    fn disabled_board_is_silent() {
        let mut board = MessageBoard::new(MessageSettings {
            enabled: false,
            zones: vec![zone("A", 0.0, 10.0, None)],
            gravity_hint: None,
        });
        assert_eq!(board.update(5.0, 0.0), None);
        assert!(!board.hint_visible());
    }

    #[test]
    fn gravity_hint_range_is_inclusive() {
        let mut board = board(Vec::new());
        board.update(-20.0, 0.0);
        assert!(board.hint_visible());
        board.update(-40.0, 0.0);
        assert!(board.hint_visible());
        board.update(-19.0, 0.0);
        assert!(!board.hint_visible());
    }

    #[test]
    fn reversed_zones_are_reported_and_never_match() {
        let zones = vec![zone("Backwards", 10.0, 0.0, None), zone("Fine", 0.0, 1.0, None)];
        assert_eq!(validate_zones(&zones), 1);

        let board = board(zones);
        assert_eq!(board.zone_at(5.0), None);
    }
}

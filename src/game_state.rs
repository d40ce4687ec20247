use std::sync::Arc;

use bevy::prelude::*;

use crate::{
    notify::{Inbox, NotificationHub, NotifyObserver},
    physics::KinematicBody,
    player::Player,
    GameSet,
};

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameCoordinator>()
            .add_observer(on_wormhole_entered)
            .add_observer(on_wormhole_completed)
            .add_systems(
                Update,
                (
                    (register_state_listeners, receive_game_state)
                        .chain()
                        .in_set(GameSet::Input),
                    detect_wormhole_entry.in_set(GameSet::Simulation),
                ),
            );
    }
}

// ── Data types ──────────────────────────────────────────────────────────────

/// The global mode of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    #[default]
    Playing,
    /// The camera is flying into a wormhole. Player input is off.
    WormholeEffect,
    /// The player has just respawned after dying. Plays like `Playing`.
    Revived,
}

impl GameState {
    /// True for the states where the player is in control.
    pub fn is_interactive(self) -> bool {
        matches!(self, GameState::Playing | GameState::Revived)
    }
}

/// Where the wormhole sequence flies the camera and where it drops the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WormholeTransit {
    pub portal: Vec3,
    pub exit: Vec3,
}

/// Owns the one authoritative `GameState`.
///
/// Nobody else writes the state. Controllers that care register an observer
/// and get every change pushed to them.
#[derive(Resource, Default)]
pub struct GameCoordinator {
    state: GameState,
    transit: Option<WormholeTransit>,
    observers: NotificationHub<GameState>,
}

impl GameCoordinator {
    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn transit(&self) -> Option<WormholeTransit> {
        self.transit
    }

    /// Registers an observer and immediately tells it the current state,
    /// so late joiners don't sit on a stale default.
    pub fn register<O: NotifyObserver<GameState> + 'static>(&mut self, observer: &Arc<O>) -> bool {
        let added = self.observers.register(observer);
        if added {
            observer.on_notify(&self.state);
        }
        added
    }

    pub fn unregister<O: NotifyObserver<GameState> + 'static>(&mut self, observer: &Arc<O>) -> bool {
        self.observers.unregister(observer)
    }

    /// Stores the new state and pushes it to every observer.
    /// Returns how many observers were notified.
    pub fn set_state(&mut self, next: GameState) -> usize {
        debug!("Game state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.observers.publish(&next)
    }

    /// Starts the wormhole sequence. Refused unless the player is in control,
    /// so a second trigger while flying does nothing.
    pub fn begin_wormhole(&mut self, transit: WormholeTransit) -> bool {
        if !self.state.is_interactive() {
            return false;
        }
        self.transit = Some(transit);
        self.set_state(GameState::WormholeEffect);
        true
    }

    /// Ends the wormhole sequence and returns where the player should go.
    pub fn finish_wormhole(&mut self) -> Option<Vec3> {
        if self.state != GameState::WormholeEffect {
            return None;
        }
        let exit = self.transit.take().map(|transit| transit.exit);
        self.set_state(GameState::Playing);
        exit
    }

    /// Dying mid-flight abandons the transit; the player respawns instead.
    pub fn revive(&mut self) {
        self.transit = None;
        self.set_state(GameState::Revived);
    }
}

// ── Components ──────────────────────────────────────────────────────────────

/// Puts an entity on the game-state hub. The hub only holds a weak handle, so
/// despawning the entity is all it takes to stop deliveries.
#[derive(Component, Clone)]
#[require(ObservedState)]
pub struct StateListener(pub Arc<Inbox<GameState>>);

impl Default for StateListener {
    fn default() -> Self {
        Self(Inbox::new())
    }
}

/// This entity's own copy of the game state, refreshed from its inbox.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ObservedState(pub GameState);

/// A wormhole portal. The entity's translation is the portal itself.
#[derive(Component, Debug, Clone, Copy)]
pub struct Wormhole {
    pub exit: Vec3,
    pub trigger_radius: f32,
}

// ── Events ──────────────────────────────────────────────────────────────────

/// The player got close enough to a portal.
#[derive(Event, Debug, Clone, Copy)]
pub struct WormholeEntered {
    pub transit: WormholeTransit,
}

/// The camera reached the portal; time to teleport.
#[derive(Event, Debug, Clone, Copy)]
pub struct WormholeCompleted;

// ── Systems ─────────────────────────────────────────────────────────────────

fn register_state_listeners(
    mut coordinator: ResMut<GameCoordinator>,
    listeners: Query<&StateListener, Added<StateListener>>,
) {
    for listener in &listeners {
        coordinator.register(&listener.0);
    }
}

fn receive_game_state(mut query: Query<(&StateListener, &mut ObservedState)>) {
    for (listener, mut observed) in &mut query {
        if let Some(state) = listener.0.latest() {
            observed.set_if_neq(ObservedState(state));
        }
    }
}

fn detect_wormhole_entry(
    mut commands: Commands,
    coordinator: Res<GameCoordinator>,
    player: Query<&Transform, With<Player>>,
    wormholes: Query<(&Transform, &Wormhole)>,
) {
    if !coordinator.state().is_interactive() {
        return;
    }
    let Ok(player_transform) = player.single() else {
        return;
    };

    for (portal_transform, wormhole) in &wormholes {
        let distance = player_transform
            .translation
            .distance(portal_transform.translation);
        if distance <= wormhole.trigger_radius {
            commands.trigger(WormholeEntered {
                transit: WormholeTransit {
                    portal: portal_transform.translation,
                    exit: wormhole.exit,
                },
            });
            // One sequence at a time.
            return;
        }
    }
}

fn on_wormhole_entered(trigger: On<WormholeEntered>, mut coordinator: ResMut<GameCoordinator>) {
    if coordinator.begin_wormhole(trigger.transit) {
        info!("Entering wormhole at {:?}", trigger.transit.portal);
    }
}

fn on_wormhole_completed(
    _trigger: On<WormholeCompleted>,
    mut coordinator: ResMut<GameCoordinator>,
    mut player: Query<(&mut Transform, &mut KinematicBody), With<Player>>,
) {
    let Some(exit) = coordinator.finish_wormhole() else {
        return;
    };
    info!("Wormhole finished, player to {:?}", exit);

    if let Ok((mut transform, mut body)) = player.single_mut() {
        transform.translation = exit;
        body.velocity = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transit() -> WormholeTransit {
        WormholeTransit {
            portal: Vec3::new(0.0, 0.0, -100.0),
            exit: Vec3::new(0.0, 0.0, -140.0),
        }
    }

    #[test]
    fn register_pushes_current_state() {
        let mut coordinator = GameCoordinator::default();
        coordinator.set_state(GameState::Revived);

        let inbox = Inbox::new();
        coordinator.register(&inbox);
        assert_eq!(inbox.drain(), vec![GameState::Revived]);
    }

    #[test]
    fn wormhole_round_trip_publishes_both_transitions() {
        let mut coordinator = GameCoordinator::default();
        let inbox = Inbox::new();
        coordinator.register(&inbox);
        inbox.drain();

        assert!(coordinator.begin_wormhole(transit()));
        assert_eq!(coordinator.state(), GameState::WormholeEffect);
        assert_eq!(coordinator.transit(), Some(transit()));

        assert_eq!(coordinator.finish_wormhole(), Some(transit().exit));
        assert_eq!(coordinator.state(), GameState::Playing);
        assert_eq!(coordinator.transit(), None);

        assert_eq!(
            inbox.drain(),
            vec![GameState::WormholeEffect, GameState::Playing]
        );
    }

    #[test]
    fn second_wormhole_trigger_is_refused() {
        let mut coordinator = GameCoordinator::default();
        assert!(coordinator.begin_wormhole(transit()));
        assert!(!coordinator.begin_wormhole(transit()));
    }

    #[test]
    fn finishing_without_a_wormhole_does_nothing() {
        let mut coordinator = GameCoordinator::default();
        let inbox = Inbox::new();
        coordinator.register(&inbox);
        inbox.drain();

        assert_eq!(coordinator.finish_wormhole(), None);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn wormhole_can_start_after_revive() {
        let mut coordinator = GameCoordinator::default();
        coordinator.revive();
        assert!(coordinator.begin_wormhole(transit()));
    }

    #[test]
    fn dying_mid_flight_drops_the_transit() {
        let mut coordinator = GameCoordinator::default();
        assert!(coordinator.begin_wormhole(transit()));

        coordinator.revive();
        assert_eq!(coordinator.state(), GameState::Revived);
        assert_eq!(coordinator.transit(), None);
        assert_eq!(coordinator.finish_wormhole(), None);

        assert!(coordinator.begin_wormhole(transit()));
        assert_eq!(coordinator.transit(), Some(transit()));
    }
}

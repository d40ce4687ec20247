use bevy::prelude::*;

use crate::{
    messages::{MessageBoard, MessageCommand},
    player::PlayerHealth,
    GameSet,
};

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_hud)
            .add_observer(on_message_command)
            .add_systems(
                Update,
                (life_text_system, gravity_hint_system).in_set(GameSet::Presentation),
            );
    }
}

const GRAVITY_DIRECTIONS: &str = "Flip gravity:\n[1] 90°   [2] 180°   [3] 270°";

#[derive(Component)]
struct LifeText;

/// The panel and the text inside it, shown and hidden together.
#[derive(Component)]
struct MessagePanel;

#[derive(Component)]
struct MessageText;

#[derive(Component)]
struct GravityHintPanel;

fn hud_text(value: impl Into<String>, font_size: f32) -> impl Bundle {
    (
        Text::new(value),
        TextFont {
            font_size,
            ..default()
        },
        TextColor(Color::WHITE),
    )
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        LifeText,
        hud_text("Life: -", 32.0),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(16.0),
            left: Val::Px(16.0),
            ..default()
        },
    ));

    commands
        .spawn((
            MessagePanel,
            Visibility::Hidden,
            Node {
                position_type: PositionType::Absolute,
                bottom: Val::Px(48.0),
                width: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                ..default()
            },
        ))
        .with_children(|parent| {
            parent.spawn((
                MessageText,
                hud_text("", 36.0),
                TextLayout::new_with_justify(Justify::Center),
                Node {
                    padding: UiRect::all(Val::Px(12.0)),
                    ..default()
                },
                BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
            ));
        });

    commands.spawn((
        GravityHintPanel,
        Visibility::Hidden,
        hud_text(GRAVITY_DIRECTIONS, 28.0),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(16.0),
            right: Val::Px(16.0),
            padding: UiRect::all(Val::Px(8.0)),
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
    ));
}

fn on_message_command(
    trigger: On<MessageCommand>,
    mut panels: Query<&mut Visibility, With<MessagePanel>>,
    mut texts: Query<&mut Text, With<MessageText>>,
) {
    let visibility = match &*trigger {
        MessageCommand::Show(message) => {
            for mut text in &mut texts {
                text.0.clone_from(message);
            }
            Visibility::Inherited
        }
        MessageCommand::Hide => Visibility::Hidden,
    };
    for mut panel in &mut panels {
        panel.set_if_neq(visibility);
    }
}

fn life_text_system(
    players: Query<&PlayerHealth, Changed<PlayerHealth>>,
    mut texts: Query<&mut Text, With<LifeText>>,
) {
    let Some(health) = players.iter().next() else {
        return;
    };
    for mut text in &mut texts {
        text.0 = format!("Life: {}", health.life());
    }
}

fn gravity_hint_system(
    board: Option<Res<MessageBoard>>,
    mut panels: Query<&mut Visibility, With<GravityHintPanel>>,
) {
    let Some(board) = board.filter(|board| board.is_changed()) else {
        return;
    };
    let visibility = if board.hint_visible() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    for mut panel in &mut panels {
        panel.set_if_neq(visibility);
    }
}

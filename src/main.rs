//! jetfly demo
//!
//! Drives `GameContext` from a macroquad window. Arrows or WASD to fly,
//! Space or Enter to try again after a crash. An optional first argument
//! names a RON config file.

use macroquad::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use jetfly::config::GameConfig;
use jetfly::game::{Entity, EntityType, GameContext};
use jetfly::system::level::{load_levels, load_levels_from_str};
use jetfly::tile::TileSource;

const BUNDLED_LEVELS: &str = include_str!("../assets/levels.ron");
/// Window pixels per world pixel
const SCALE: f32 = 3.0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("jetfly v{}", jetfly::VERSION),
        window_width: (240.0 * SCALE) as i32,
        window_height: (160.0 * SCALE) as i32,
        window_resizable: false,
        ..Default::default()
    }
}

fn init_tracing(config: &GameConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn kind_color(entity: &Entity) -> Color {
    match entity.entity_type {
        EntityType::Player if entity.is_dead() => Color::from_rgba(120, 60, 60, 255),
        EntityType::Player => Color::from_rgba(240, 220, 120, 255),
        EntityType::Food => Color::from_rgba(220, 120, 80, 255),
        EntityType::Item | EntityType::Collectable => Color::from_rgba(120, 200, 240, 255),
        EntityType::Goal => Color::from_rgba(120, 220, 120, 255),
        EntityType::Asteroid | EntityType::Obstacle => Color::from_rgba(140, 130, 150, 255),
        EntityType::Enemy => Color::from_rgba(200, 80, 160, 255),
        EntityType::None | EntityType::Null => WHITE,
    }
}

fn draw(game: &GameContext) {
    clear_background(Color::from_rgba(30, 30, 35, 255));
    let view = |p: Vec2| game.camera.to_view(p) * SCALE;

    let size = game.tiles.tile_size();
    let (cols, rows) = ((game.room.x / size).ceil() as i32, (game.room.y / size).ceil() as i32);
    for gy in 0..rows {
        for gx in 0..cols {
            let Some(tile) = game.tiles.tile_at(gx, gy, &game.config.collision_layer) else { continue };
            if tile.is_empty() {
                continue;
            }
            let p = view(Vec2::new(tile.pixel_x, tile.pixel_y));
            draw_rectangle(p.x, p.y, size * SCALE, size * SCALE, Color::from_rgba(70, 60, 90, 255));
        }
    }

    let mut entities: Vec<&Entity> = game.manager.graph().entities().filter(|e| e.visible).collect();
    entities.sort_by_key(|e| e.id);
    for entity in entities {
        let p = view(entity.position);
        draw_circle(p.x, p.y, entity.radius * SCALE, kind_color(entity));
        if game.config.debug_boxes {
            let b = view(entity.debug_box);
            draw_rectangle_lines(b.x, b.y, entity.dimension.x * SCALE, entity.dimension.y * SCALE, 1.0, RED);
        }
    }

    let banner = if game.level.gameover {
        Some("GAME OVER - press space")
    } else if game.level.complete {
        Some("LEVEL COMPLETE")
    } else {
        None
    };
    if let Some(text) = banner {
        let dims = measure_text(text, None, 32, 1.0);
        draw_text(text, (screen_width() - dims.width) * 0.5, screen_height() * 0.5, 32.0, WHITE);
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let config_path = std::env::args().nth(1);
    let (config, config_error) = match config_path.as_deref().map(GameConfig::load) {
        Some(Ok(config)) => (config, None),
        Some(Err(e)) => (GameConfig::default(), Some(e)),
        None => (GameConfig::default(), None),
    };
    init_tracing(&config);
    if let Some(e) = config_error {
        error!(error = %e, "config rejected, using defaults");
    }

    let levels = match &config.levels_path {
        Some(path) => load_levels(path),
        None => load_levels_from_str(BUNDLED_LEVELS),
    };
    let levels = match levels {
        Ok(levels) => levels,
        Err(e) => {
            error!(error = %e, "could not load levels");
            return;
        }
    };
    info!(levels = levels.len(), version = jetfly::VERSION, "starting jetfly");

    let mut game = GameContext::new(config, levels);
    game.start();

    loop {
        game.input.poll();
        let delta = get_frame_time().min(game.config.max_delta);
        if let Err(e) = game.update(delta) {
            error!(error = %e, "frame failed, stopping");
            break;
        }
        draw(&game);
        next_frame().await;
    }
}

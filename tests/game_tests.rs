//! Engine tests driven through the public `Game` surface
//!
//! Test categories:
//! - Piece movement and collision
//! - Rotation
//! - Gravity and locking
//! - Line clearing and scoring
//! - Game over detection
//! - Restart, snapshot and command dispatch

use blockfall::config::{ConfigError, GameConfig, PixelGeometry, SCORE_SINGLE, SCORE_TETRIS};
use blockfall::game::{test_helpers::*, Command, Game, GameEvent, Phase};
use blockfall::grid::{Grid, Position};
use blockfall::piece::{
    resolve_absolute_cells, rotate, PieceSpec, SequencePieceProvider, SettledPiece, ShapeKind,
};

fn config() -> GameConfig {
    GameConfig {
        seed: Some(1),
        ..GameConfig::default()
    }
}

fn grid() -> Grid {
    Grid::new(10, 20, PixelGeometry::default())
}

fn game_with(pieces: Vec<PieceSpec>, settled: Vec<SettledPiece>) -> Game {
    let provider = Box::new(SequencePieceProvider::new(pieces));
    Game::with_settled(config(), provider, settled).expect("valid config")
}

fn square_game(settled: Vec<SettledPiece>) -> Game {
    game_with(vec![PieceSpec::new(ShapeKind::Square)], settled)
}

fn vertical_i() -> PieceSpec {
    PieceSpec::with_facing(ShapeKind::I, 1)
}

fn anchor(game: &Game) -> Position {
    game.active().expect("active piece").anchor()
}

fn marker(grid: &Grid, cells: &[(i32, i32)]) -> SettledPiece {
    SettledPiece::new(
        ShapeKind::Z,
        cells.iter().map(|&(col, row)| grid.index_of(col, row)).collect(),
    )
}

/// Slides the active piece to column 0 and soft-drops it as far as it goes.
fn park_in_left_column(game: &mut Game) {
    while game.move_left() {}
    while game.soft_drop() {}
}

// ============================================================================
// Piece Movement Tests
// ============================================================================

mod piece_movement {
    use super::*;

    #[test]
    fn piece_spawns_at_anchor() {
        let game = square_game(vec![]);
        assert_eq!(anchor(&game), Position::new(5, 3));
        assert_eq!(game.phase(), Phase::Play);
    }

    #[test]
    fn piece_moves_left() {
        let mut game = square_game(vec![]);

        assert!(game.move_left());
        assert_eq!(anchor(&game), Position::new(4, 3));
    }

    #[test]
    fn piece_moves_right() {
        let mut game = square_game(vec![]);

        assert!(game.move_right());
        assert_eq!(anchor(&game), Position::new(6, 3));
    }

    #[test]
    fn soft_drop_moves_down_one() {
        let mut game = square_game(vec![]);

        assert!(game.soft_drop());
        assert_eq!(anchor(&game), Position::new(5, 4));
    }

    #[test]
    fn piece_cannot_move_through_left_wall() {
        let mut game = square_game(vec![]);
        for _ in 0..5 {
            assert!(game.move_left());
        }

        assert!(!game.move_left());
        assert_eq!(anchor(&game).col, 0);
    }

    #[test]
    fn piece_cannot_move_through_right_wall() {
        // Square is two wide, so the anchor stops at column 8
        let mut game = square_game(vec![]);
        for _ in 0..3 {
            assert!(game.move_right());
        }

        assert!(!game.move_right());
        assert_eq!(anchor(&game).col, 8);
    }

    #[test]
    fn piece_cannot_move_through_floor() {
        let mut game = square_game(vec![]);
        let mut drops = 0;
        while game.soft_drop() {
            drops += 1;
        }

        assert_eq!(drops, 16);
        assert_eq!(anchor(&game).row, 19);
    }

    #[test]
    fn piece_cannot_move_into_settled_cell() {
        let grid = grid();
        let mut game = square_game(vec![marker(&grid, &[(5, 10)])]);
        while game.soft_drop() {}

        assert_eq!(anchor(&game), Position::new(5, 9));
    }

    #[test]
    fn single_column_piece_cannot_wrap_past_right_wall() {
        // A vertical I touches only one wall, so the wrap is caught by the
        // single-step guard rather than the wall check.
        let mut game = game_with(vec![vertical_i()], vec![]);
        for _ in 0..4 {
            assert!(game.move_right());
        }
        game.take_events();

        assert!(!game.move_right());
        assert_eq!(anchor(&game), Position::new(9, 3));
        assert_eq!(game.take_events(), vec![GameEvent::MoveRejected]);
    }

    #[test]
    fn rejected_move_leaves_cells_unchanged() {
        let mut game = square_game(vec![]);
        while game.move_left() {}
        let before = game.active().unwrap().cells().to_vec();

        assert!(!game.move_left());
        assert_eq!(game.active().unwrap().cells(), before.as_slice());
    }

    #[test]
    fn move_emits_event() {
        let mut game = square_game(vec![]);
        game.take_events();

        game.move_left();

        assert_eq!(game.take_events(), vec![GameEvent::PieceMoved]);
    }
}

// ============================================================================
// Rotation Tests
// ============================================================================

mod rotation {
    use super::*;

    #[test]
    fn rotation_advances_stage_and_cells() {
        let grid = grid();
        let mut game = game_with(vec![PieceSpec::new(ShapeKind::T)], vec![]);

        assert!(game.rotate());

        let piece = game.active().unwrap();
        assert_eq!(piece.rotation(), 1);
        assert_eq!(piece.spec(), PieceSpec::new(ShapeKind::T));
        let expected = resolve_absolute_cells(
            &grid,
            Position::new(5, 3),
            &rotate(&PieceSpec::new(ShapeKind::T).base_offsets(), 1),
        );
        assert_eq!(piece.cells(), expected.as_slice());
    }

    #[test]
    fn four_rotations_restore_cells() {
        let mut game = game_with(vec![PieceSpec::new(ShapeKind::T)], vec![]);
        let before = game.active().unwrap().cells().to_vec();

        for _ in 0..4 {
            assert!(game.rotate());
        }

        assert_eq!(game.active().unwrap().rotation(), 0);
        assert_eq!(game.active().unwrap().cells(), before.as_slice());
    }

    #[test]
    fn rotation_wrapping_across_walls_is_rejected() {
        let mut game = game_with(vec![vertical_i()], vec![]);
        while game.move_right() {}
        let piece = game.active().unwrap();
        assert_eq!(piece.anchor().col, 9);
        let offsets = piece.offsets();
        let cells = piece.cells().to_vec();

        assert!(!game.rotate());

        let piece = game.active().unwrap();
        assert_eq!(piece.rotation(), 0);
        assert_eq!(piece.offsets(), offsets);
        assert_eq!(piece.cells(), cells.as_slice());
    }

    #[test]
    fn rotation_into_settled_cell_is_rejected() {
        // T stage 1 reaches (5, 1)
        let grid = grid();
        let mut game = game_with(vec![PieceSpec::new(ShapeKind::T)], vec![marker(&grid, &[(5, 1)])]);

        assert!(!game.rotate());
        assert_eq!(game.active().unwrap().rotation(), 0);
    }

    #[test]
    fn rotation_emits_event() {
        let mut game = game_with(vec![PieceSpec::new(ShapeKind::T)], vec![]);
        game.take_events();

        game.rotate();

        assert_eq!(game.take_events(), vec![GameEvent::PieceRotated]);
    }
}

// ============================================================================
// Gravity Tests
// ============================================================================

mod gravity {
    use super::*;

    #[test]
    fn first_tick_only_anchors_the_timer() {
        let mut game = square_game(vec![]);

        game.tick(5_000);
        assert_eq!(anchor(&game).row, 3);

        game.tick(5_799);
        assert_eq!(anchor(&game).row, 3);

        game.tick(5_800);
        assert_eq!(anchor(&game).row, 4);
    }

    #[test]
    fn piece_falls_and_locks_at_floor() {
        let mut game = game_with(
            vec![PieceSpec::new(ShapeKind::Square), PieceSpec::new(ShapeKind::T)],
            vec![],
        );
        game.take_events();

        let mut now = 0;
        while game.phase() == Phase::Play && game.settled().is_empty() {
            game.tick(now);
            now += 800;
            assert!(now < 100_000, "piece never landed");
        }
        assert_eq!(game.phase(), Phase::Collision);

        game.tick(now);

        assert_eq!(game.phase(), Phase::Play);
        assert_eq!(game.settled().len(), 1);
        assert_eq!(game.filled_count_in_row(19), 2);
        assert_eq!(game.active().unwrap().kind(), ShapeKind::T);
        let events = game.take_events();
        assert!(events.contains(&GameEvent::PieceLocked));
        assert!(events.contains(&GameEvent::PieceSpawned(ShapeKind::T)));
    }

    #[test]
    fn commands_are_ignored_while_colliding() {
        let mut game = square_game(vec![]);
        while game.soft_drop() {}
        game.tick(0);
        assert_eq!(game.phase(), Phase::Collision);

        assert!(!game.move_left());
        assert!(!game.rotate());
    }
}

// ============================================================================
// Line Clearing Tests
// ============================================================================

mod line_clearing {
    use super::*;

    #[test]
    fn single_row_clear_scores_and_drops_cells() {
        let grid = grid();
        let settled = vec![
            filled_row_with_gap(&grid, 15, &[0]),
            marker(&grid, &[(4, 14), (8, 13)]),
            marker(&grid, &[(0, 17)]),
        ];
        let mut game = game_with(vec![vertical_i(), PieceSpec::new(ShapeKind::Square)], settled);

        park_in_left_column(&mut game);
        assert_eq!(anchor(&game), Position::new(0, 13));

        game.tick(10_000);
        assert_eq!(game.phase(), Phase::Collision);
        game.tick(10_016);
        assert_eq!(game.phase(), Phase::RowAnimation);
        assert_eq!(game.pending_rows().len(), 1);
        assert_eq!(game.pending_rows()[0].row, 15);

        game.tick(11_000);
        assert_eq!(game.phase(), Phase::RowAnimation);
        assert_eq!(game.score(), 0);

        game.tick(11_816);
        assert_eq!(game.phase(), Phase::Play);
        assert_eq!(game.score(), SCORE_SINGLE);
        assert_eq!(game.lines_cleared(), 1);

        let mut cells = game.settled_cells();
        cells.sort_unstable();
        let mut expected: Vec<_> = [(8, 14), (0, 14), (0, 15), (4, 15), (0, 16), (0, 17)]
            .iter()
            .map(|&(col, row)| grid.index_of(col, row))
            .collect();
        expected.sort_unstable();
        assert_eq!(cells, expected);
    }

    #[test]
    fn four_row_clear_scores_once() {
        let grid = grid();
        let settled = (16..20)
            .map(|row| filled_row_with_gap(&grid, row, &[0]))
            .collect();
        let mut game = game_with(vec![vertical_i(), PieceSpec::new(ShapeKind::Square)], settled);
        park_in_left_column(&mut game);
        game.take_events();

        game.tick(0);
        game.tick(16);
        assert_eq!(game.pending_rows().len(), 4);
        game.tick(16 + 2_000);

        assert_eq!(game.phase(), Phase::Play);
        assert_eq!(game.score(), SCORE_TETRIS);
        assert!(game.settled().is_empty());
        let clears: Vec<_> = game
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::LinesCleared(_)))
            .collect();
        assert_eq!(clears, vec![GameEvent::LinesCleared(4)]);
    }

    #[test]
    fn animation_reveals_cells_in_snapshot() {
        let grid = grid();
        let settled = vec![filled_row_with_gap(&grid, 19, &[0])];
        let mut game = game_with(vec![vertical_i(), PieceSpec::new(ShapeKind::Square)], settled);
        park_in_left_column(&mut game);

        assert!(game.snapshot().reveals.is_empty());
        game.tick(0);
        game.tick(0);
        let snapshot = game.snapshot();
        assert_eq!(snapshot.reveals.len(), 10);
        assert!(snapshot.reveals.iter().all(|r| !r.revealed));

        game.tick(500);
        let snapshot = game.snapshot();
        assert_eq!(snapshot.phase, Phase::RowAnimation);
        assert!(snapshot.active_cells.is_empty());
        assert_eq!(snapshot.reveals.len(), 10);
        assert_eq!(snapshot.reveals.iter().filter(|r| r.revealed).count(), 3);
    }

    #[test]
    fn incomplete_row_does_not_animate() {
        let grid = grid();
        let settled = vec![filled_row_with_gap(&grid, 19, &[0, 9])];
        let mut game = game_with(vec![vertical_i(), PieceSpec::new(ShapeKind::Square)], settled);
        park_in_left_column(&mut game);

        game.tick(0);
        game.tick(0);

        assert_eq!(game.phase(), Phase::Play);
        assert_eq!(game.filled_count_in_row(19), 9);
    }

    #[test]
    fn level_rises_every_ten_lines() {
        let mut game = square_game(vec![]);
        game.take_events();

        game.add_score(4);
        game.add_score(4);
        assert_eq!(game.level(), 1);
        game.add_score(2);

        assert_eq!(game.level(), 2);
        assert_eq!(game.score(), 800 + 800 + 300);
        assert!(game.take_events().contains(&GameEvent::LevelUp(2)));
        assert!(game.drop_interval_ms() < config().base_tick_ms);
    }
}

// ============================================================================
// Game Over Tests
// ============================================================================

mod game_over {
    use super::*;

    fn blocked_game() -> Game {
        // The square lands on (5, 4) and then occupies the spawn anchor
        let grid = grid();
        square_game(vec![marker(&grid, &[(5, 4)])])
    }

    #[test]
    fn occupied_spawn_ends_game_from_collision() {
        let mut game = blocked_game();

        game.tick(0);
        assert_eq!(game.phase(), Phase::Collision);
        game.tick(16);

        assert_eq!(game.phase(), Phase::GameOver);
        assert!(game.active().is_none());
        assert!(game.take_events().contains(&GameEvent::GameOver));
    }

    #[test]
    fn nothing_changes_after_game_over() {
        let mut game = blocked_game();
        game.tick(0);
        game.tick(16);
        let settled = game.settled_cells();

        assert!(!game.move_left());
        assert!(!game.soft_drop());
        assert!(!game.rotate());
        game.tick(10_000);

        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.settled_cells(), settled);
    }

    #[test]
    fn cells_shifted_into_spawn_end_game() {
        // (6, 1) sits just above the square's spawn cells and drops into
        // them once the bottom row clears.
        let grid = grid();
        let settled = vec![
            filled_row_with_gap(&grid, 19, &[0]),
            marker(&grid, &[(6, 1)]),
        ];
        let mut game = game_with(vec![vertical_i(), PieceSpec::new(ShapeKind::Square)], settled);
        park_in_left_column(&mut game);

        game.tick(0);
        game.tick(0);
        assert_eq!(game.phase(), Phase::RowAnimation);
        game.tick(2_000);

        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.score(), SCORE_SINGLE);
        assert!(game.active().is_none());
    }

    #[test]
    fn blocked_spawn_at_start_is_game_over() {
        let game = square_game(vec![filled_row(&grid(), 3)]);
        assert!(game.is_game_over());
    }
}

// ============================================================================
// Session Tests
// ============================================================================

mod session {
    use super::*;

    #[test]
    fn restart_resets_everything() {
        let grid = grid();
        let mut game = square_game(vec![marker(&grid, &[(5, 4)])]);
        game.tick(0);
        game.tick(16);
        assert!(game.is_game_over());

        game.restart();

        assert_eq!(game.phase(), Phase::Play);
        assert_eq!(game.score(), 0);
        assert!(game.settled().is_empty());
        assert_eq!(anchor(&game), Position::new(5, 3));
        assert_eq!(game.take_events().last(), Some(&GameEvent::GameRestarted));
    }

    #[test]
    fn preview_queue_follows_provider() {
        let game = game_with(
            vec![
                PieceSpec::new(ShapeKind::T),
                PieceSpec::new(ShapeKind::S),
                PieceSpec::new(ShapeKind::Z),
                PieceSpec::new(ShapeKind::LForward),
                PieceSpec::new(ShapeKind::LBackward),
            ],
            vec![],
        );

        assert_eq!(game.active().unwrap().kind(), ShapeKind::T);
        let preview: Vec<_> = game.preview_queue().iter().map(|s| s.kind).collect();
        assert_eq!(
            preview,
            vec![ShapeKind::S, ShapeKind::Z, ShapeKind::LForward, ShapeKind::LBackward]
        );
        assert_eq!(game.snapshot().next, Some(ShapeKind::S));
    }

    #[test]
    fn dispatch_ignores_unknown_commands() {
        let mut game = square_game(vec![]);

        assert!(!game.dispatch("hardDrop"));
        assert_eq!(anchor(&game), Position::new(5, 3));

        assert!(game.dispatch("moveLeft"));
        assert_eq!(anchor(&game), Position::new(4, 3));
        assert_eq!(Command::parse("rotate"), Some(Command::Rotate));
    }

    #[test]
    fn snapshot_reports_cells_and_score() {
        let grid = grid();
        let game = square_game(vec![marker(&grid, &[(0, 19)])]);
        let snapshot = game.snapshot();

        assert_eq!(snapshot.phase, Phase::Play);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.active_kind, Some(ShapeKind::Square));
        assert_eq!(snapshot.active_cells.len(), 4);
        assert_eq!(snapshot.settled_cells, vec![(190, ShapeKind::Z)]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GameConfig {
            cols: 3,
            ..GameConfig::default()
        };
        assert!(matches!(
            Game::new(config),
            Err(ConfigError::TooNarrow { cols: 3 })
        ));
    }

    #[test]
    fn oversized_config_is_rejected_before_building_grid() {
        let wide = GameConfig {
            cols: usize::MAX / 2,
            ..GameConfig::default()
        };
        assert!(matches!(Game::new(wide), Err(ConfigError::TooLarge { .. })));

        let terminal_wide = GameConfig {
            cols: 32_760,
            ..GameConfig::default()
        };
        assert!(matches!(
            Game::new(terminal_wide),
            Err(ConfigError::TooLarge { .. })
        ));
    }

    #[test]
    fn random_session_stays_consistent() {
        let mut game = Game::new(config()).expect("valid config");
        let commands = [
            Command::MoveLeft,
            Command::Rotate,
            Command::MoveRight,
            Command::SoftDrop,
            Command::SoftDrop,
        ];
        let mut now = 0;

        for step in 0..2_000 {
            game.apply(commands[step % commands.len()]);
            game.tick(now);
            now += 50;

            let snapshot = game.snapshot();
            let grid = game.grid();
            for &cell in &snapshot.active_cells {
                assert!(grid.is_in_bounds(cell));
                assert!(snapshot.settled_cells.iter().all(|&(s, _)| s != cell));
            }
            let mut settled: Vec<_> = snapshot.settled_cells.iter().map(|&(c, _)| c).collect();
            settled.sort_unstable();
            settled.dedup();
            assert_eq!(settled.len(), snapshot.settled_cells.len());

            if game.is_game_over() {
                game.restart();
            }
        }
    }
}

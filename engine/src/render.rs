//! Text rendering of a game state. Reads only; never mutates.

use crate::board::{Cell, Point};
use crate::game::{Direction, GameState};

/// Level-file glyphs: `#` wall, `x` free destination, `c` crate, `g` crate on
/// destination, `p` player, ` ` empty.
pub fn room_text(state: &GameState) -> String {
    let (rows, cols) = state.board.dimensions();
    let mut out = String::with_capacity(rows * (cols + 1));
    for row in 0..rows {
        for col in 0..cols {
            out.push(glyph(state, Point::new(row, col)));
        }
        if row + 1 < rows {
            out.push('\n');
        }
    }
    out
}

fn glyph(state: &GameState, p: Point) -> char {
    if state.player.position == p {
        return 'p';
    }
    if let Some(i) = state.entities.crate_at(p) {
        return if state.entities.crates()[i].on_target { 'g' } else { 'c' };
    }
    match state.board.cell(p) {
        Cell::Wall => '#',
        Cell::Destination => 'x',
        Cell::Empty => ' ',
    }
}

/// Sprite strip and frame to draw for the player this tick.
pub fn player_sprite(state: &GameState) -> (Direction, u32) {
    (state.player.facing, state.player.animation.frame_index())
}

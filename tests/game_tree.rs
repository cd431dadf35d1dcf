use chrono::{TimeDelta, Utc};
use replay_chess::START_POSITION;
use replay_chess::config::ReplayConfig;
use replay_chess::domain::{Badge, Colour, GameTree, Move};
use replay_chess::models::{Game, GameError};

fn mv(text: &str) -> Move {
    text.parse().unwrap()
}

fn play_all(game: &mut Game, moves: &[&str]) {
    for text in moves {
        game.play(&mv(text)).unwrap();
    }
}

const KING_SIDE: &str = "♔e1♔g1♖h1♖f1";

fn can_castle(game: &Game) -> bool {
    game.moves().iter().any(|m| m.to_string() == KING_SIDE)
}

#[test]
fn test_castling_lost_after_rook_returns() {
    let mut game = Game::from_notation("♚e8♜h8♔e1♖h1").unwrap();
    let root = game.board();
    assert!(can_castle(&game));

    play_all(&mut game, &["♖h1♖h2", "♜h8♜h7", "♖h2♖h1", "♜h7♜h8"]);
    assert_eq!(game.position(), Game::from_notation("♚e8♜h8♔e1♖h1").unwrap().position());
    assert!(!can_castle(&game));

    game.go_to(root).unwrap();
    assert!(can_castle(&game));

    // walking back along the line restores the right at the root only
    game.forward().unwrap();
    game.forward().unwrap();
    game.backward().unwrap();
    game.backward().unwrap();
    assert_eq!(game.board(), root);
    assert!(can_castle(&game));
}

#[test]
fn test_castle_then_unplay() {
    let mut game = Game::from_notation("♚e8♔e1♖h1♖a1").unwrap();
    let before = game.position().clone();
    game.play(&mv(KING_SIDE)).unwrap();
    let last = *game.last_move().unwrap();
    assert!(last.is_castle());
    assert!(game.position().contains(&"♖f1".parse().unwrap()));

    game.play(&mv("♚e8♚d8")).unwrap();
    game.backward().unwrap();
    game.backward().unwrap();
    assert_eq!(game.position(), &before);
    // the king has moved in this line but not at the root
    assert!(can_castle(&game));
}

#[test]
fn test_en_passant_survives_navigation() {
    let mut game = Game::start().unwrap();
    play_all(&mut game, &["♙e2♙e4", "♞g8♞f6", "♙e4♙e5", "♟d7♟d5"]);
    let capture = mv("♙e5♙d6♟d5");
    assert!(game.moves().contains(&capture));

    game.play(&capture).unwrap();
    assert!(!game.position().contains(&"♟d5".parse().unwrap()));
    game.backward().unwrap();
    assert!(game.position().contains(&"♟d5".parse().unwrap()));
    assert!(game.moves().contains(&capture));

    // a fresh game at the same node derives the same last move
    let board = game.board();
    let reloaded = Game::new(game.into_tree(), board).unwrap();
    assert!(reloaded.moves().contains(&capture));
}

fn recorded_puzzle() -> (Game, usize) {
    let mut game = Game::from_notation("♚h8♔a1♖b2♙g2").unwrap();
    let root = game.board();
    let puzzle = game.tree_mut().create_puzzle(root, Utc::now()).unwrap();
    play_all(&mut game, &["♖b2♖b8", "♚h8♚h7", "♙g2♙g4"]);
    game.go_to(root).unwrap();
    (game, puzzle)
}

#[test]
fn test_computer_replays_recorded_line() {
    let (mut game, puzzle) = recorded_puzzle();
    let nodes = game.tree().len();
    game.set_computer(Some(Colour::Black));

    game.play(&mv("♖b2♖b8")).unwrap();
    // the reply was played at once
    assert_eq!(game.turn(), Colour::White);
    assert_eq!(game.last_move().unwrap().to_string(), "♚h8♚h7");
    assert_eq!(game.computer(), Some(Colour::Black));

    game.play(&mv("♙g2♙g4")).unwrap();
    assert_eq!(game.computer(), None);
    let puzzle = game.tree().puzzle(puzzle).unwrap();
    assert!(puzzle.finished);
    assert_eq!(puzzle.strikes, 0);
    assert!(puzzle.due > Utc::now() + TimeDelta::hours(47));
    assert_eq!(game.tree().len(), nodes);
}

#[test]
fn test_wrong_moves_count_strikes() {
    let (game, puzzle) = recorded_puzzle();
    let config = ReplayConfig { strike_limit: 2 };
    let mut game = game.with_replay_config(&config);
    game.set_computer(Some(Colour::Black));

    game.play(&mv("♙g2♙g3")).unwrap();
    let wrong = game.board();
    assert_eq!(game.tree().node(wrong).unwrap().badge, Badge::Wrong);
    assert_eq!(game.tree().puzzle(puzzle).unwrap().strikes, 1);
    assert_eq!(game.computer(), Some(Colour::Black));

    game.backward().unwrap();
    game.play(&mv("♙g2♙g3")).unwrap();
    assert_eq!(game.board(), wrong);
    let puzzle = game.tree().puzzle(puzzle).unwrap();
    assert_eq!(puzzle.strikes, 2);
    assert!(puzzle.finished);
    assert_eq!(game.computer(), None);
}

#[test]
fn test_computer_move_without_recorded_line() {
    let mut game = Game::from_notation("♚h8♔a1♖b2").unwrap();
    assert!(!game.computer_move().unwrap());
    assert_eq!(game.computer(), None);
}

#[test]
fn test_opening_merges_duplicate_roots() {
    let mut first = Game::start().unwrap();
    play_all(&mut first, &["♙e2♙e4", "♟e7♟e5"]);
    first.set_comment("king pawn").unwrap();
    let mut tree = first.into_tree();

    let later = tree
        .create_node(None, START_POSITION, Badge::Correct, Utc::now() + TimeDelta::seconds(5))
        .unwrap();
    let (e4, _) = tree
        .add_move(later, "♙e2♙e4", Badge::Correct, Utc::now())
        .unwrap();
    let (c5, _) = tree
        .add_move(e4, "♟c7♟c5", Badge::Correct, Utc::now())
        .unwrap();
    tree.set_comment(c5, "sicilian").unwrap();
    tree.add_move(later, "♙d2♙d4", Badge::Correct, Utc::now())
        .unwrap();
    assert_eq!(tree.roots().count(), 2);

    let mut game = Game::opening(tree).unwrap();
    assert_eq!(game.tree().roots().count(), 1);
    assert!(game.tree().get(later).is_none());

    game.play(&mv("♙e2♙e4")).unwrap();
    let replies: Vec<String> = game
        .tree()
        .node(game.board())
        .unwrap()
        .children()
        .iter()
        .map(|&c| game.tree().node(c).unwrap().pieces().to_string())
        .collect();
    assert_eq!(replies, ["♟e7♟e5", "♟c7♟c5"]);
    assert_eq!(game.tree().node(c5).unwrap().comment, "sicilian");

    game.backward().unwrap();
    game.play(&mv("♙d2♙d4")).unwrap();
    assert_eq!(game.history().unwrap(), "♙d2♙d4");
}

#[test]
fn test_tree_survives_json() {
    let (mut game, puzzle) = recorded_puzzle();
    game.forward().unwrap();
    game.set_comment("rook check").unwrap();
    let board = game.board();
    let json = game.tree().to_json().unwrap();

    let tree = GameTree::from_json(&json).unwrap();
    assert_eq!(tree.puzzle(puzzle), game.tree().puzzle(puzzle));
    let reloaded = Game::new(tree, board).unwrap();
    assert_eq!(reloaded.position(), game.position());
    assert_eq!(reloaded.moves(), game.moves());
    assert!(reloaded.in_check());
    assert_eq!(reloaded.tree().node(board).unwrap().comment, "rook check");

    assert!(matches!(
        Game::new(GameTree::from_json(&json).unwrap(), 99),
        Err(GameError::Tree(_))
    ));
}

#[test]
fn test_puzzles_for_today() {
    let (mut game, puzzle) = recorded_puzzle();
    let now = Utc::now();
    assert_eq!(game.tree().puzzles_for_today(now).len(), 1);

    let scheduled = game.tree_mut().puzzle_mut(puzzle).unwrap();
    scheduled.solved = now - TimeDelta::days(10);
    scheduled.due = now + TimeDelta::days(10);
    assert!(game.tree().puzzles_for_today(now).is_empty());
}

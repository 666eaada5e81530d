use std::collections::BTreeSet;

use mindboard_game::{
    GameConfig, GameSession, PieceKind, QuestionBank, SessionState, Subscale, Tile,
};
use serde_json::Value;

#[test]
fn default_bank_has_seven_items_per_subscale() {
    let bank = QuestionBank::default_bank();
    assert_eq!(bank.len(), 21);
    let ids: Vec<u8> = bank.questions.iter().map(|q| q.id).collect();
    assert_eq!(ids, (1..=21).collect::<Vec<_>>());

    let triggers = bank.trigger_sets();
    assert!(triggers.is_disjoint());
    assert_eq!(
        triggers.positions(Subscale::Stress),
        BTreeSet::from([5, 9, 14, 18, 23, 27, 30])
    );
    assert_eq!(
        triggers.positions(Subscale::Anxiety),
        BTreeSet::from([33, 37, 40, 48, 52, 56, 60])
    );
    assert_eq!(
        triggers.positions(Subscale::Depression),
        BTreeSet::from([64, 70, 75, 80, 87, 95, 98])
    );
    assert_eq!(triggers.subscale_for(14), Some(Subscale::Stress));

    for question in &bank.questions {
        assert_eq!(question.options.len(), 4, "question {}", question.id);
        assert!(!question.prompt.is_empty());
        assert!(!question.fun_fact.is_empty());
    }
}

#[test]
fn default_board_layout() {
    let board = GameConfig::default().board;
    let cells = |kind: PieceKind| -> Vec<u8> {
        board
            .pieces
            .iter()
            .filter(|(_, piece)| piece.kind == kind)
            .map(|(cell, _)| *cell)
            .collect()
    };
    assert_eq!(cells(PieceKind::Rook), vec![7, 43, 76, 92]);
    assert_eq!(cells(PieceKind::Bishop), vec![19, 36, 47]);
    assert_eq!(cells(PieceKind::Queen), vec![28, 51]);
    assert_eq!(cells(PieceKind::Knight), vec![39, 49, 59, 82, 88, 97]);
    assert_eq!(board.tile_at(1), None);
    assert_eq!(board.tile_at(100), None);
    assert_eq!(board.tile_at(51), Some(Tile::Queen));
}

#[test]
fn config_json_roundtrip_preserves_everything() {
    let config = GameConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let parsed = GameConfig::from_json(&json).unwrap();
    assert_eq!(parsed, config);
    assert_eq!(parsed.validate(), Ok(()));
}

#[test]
fn session_snapshot_shape() {
    let mut session = GameSession::with_seed(0xC0FFEE);
    session.start().unwrap();
    session.roll_value(4).unwrap();
    session.advance_to_rest().unwrap();

    let value: Value = serde_json::to_value(session.state()).unwrap();
    assert_eq!(value["position"], 5);
    assert_eq!(value["phase"]["phase"], "awaiting_answer");
    assert_eq!(value["phase"]["question_id"], 1);
    assert_eq!(value["phase"]["resume"]["kind"], "roll");
    assert_eq!(value["events"][0]["event"], "started");

    let state: SessionState = serde_json::from_value(value).unwrap();
    assert_eq!(&state, session.state());
}

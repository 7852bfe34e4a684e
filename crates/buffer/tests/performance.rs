//! Performance sanity checks for the line tree.
//!
//! These tests verify that basic operations complete within reasonable time
//! bounds. They are not formal benchmarks but guard against accidental
//! quadratic behavior; the bounds leave room for unoptimized test builds.

use std::time::{Duration, Instant};

use textbox_buffer::{MonospaceLayout, Position, TextTree};

fn new_tree() -> TextTree {
    TextTree::new(MonospaceLayout::default())
}

#[test]
fn type_100k_chars_with_newlines_under_2s() {
    let mut tree = new_tree();
    let start = Instant::now();

    for i in 0..100_000 {
        let caret = tree.char_count();
        let ch = if i % 80 == 79 { '\n' } else { 'x' };
        tree.insert_char(caret, ch).unwrap();
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(2),
        "Typing 100K characters took {:?}, expected < 2s",
        elapsed
    );
    assert_eq!(tree.line_count(), 1251);
    tree.check_invariants().unwrap();
}

#[test]
fn paste_100k_lines_under_2s() {
    let text: String = (0..100_000).map(|i| format!("row {i}\n")).collect();
    let mut tree = new_tree();
    let start = Instant::now();

    tree.insert(0, &text).unwrap();

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(2),
        "Pasting 100K lines took {:?}, expected < 2s",
        elapsed
    );
    assert_eq!(tree.line_count(), 100_001);
    assert!(tree.height() <= 7);
}

#[test]
fn line_lookup_performance() {
    let text: String = (0..10_000).map(|i| format!("Line number {i}\n")).collect();
    let tree = TextTree::with_text(MonospaceLayout::default(), &text);
    let start = Instant::now();

    for _ in 0..10 {
        for number in 0..tree.line_count() {
            let line = tree.line_by_number(number).unwrap();
            let offset = tree.line_start(line).unwrap();
            let (found, _) = tree.line_by_offset(offset).unwrap();
            assert_eq!(found, line);
        }
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(2),
        "Looking up {} lines 10 times took {:?}, expected < 2s",
        tree.line_count(),
        elapsed
    );
}

#[test]
fn backspace_everything_performance() {
    let text: String = (0..500).map(|i| format!("entry {i}\n")).collect();
    let mut tree = TextTree::with_text(MonospaceLayout::default(), &text);
    let start = Instant::now();

    let mut caret = tree.char_count();
    while caret > 0 {
        tree.remove(caret - 1, 1).unwrap();
        caret -= 1;
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(2),
        "Deleting {} characters took {:?}, expected < 2s",
        text.len(),
        elapsed
    );
    assert_eq!(tree.line_count(), 1);
    assert_eq!(tree.height(), 2);
}

#[test]
fn mixed_operations_performance() {
    let mut tree = new_tree();
    let start = Instant::now();

    for iteration in 0..1000 {
        let mut caret = tree.char_count();
        caret += tree.insert(caret, &format!("Line {iteration}: ")).unwrap();

        // typo and correction
        tree.insert_char(caret, 'x').unwrap();
        tree.remove(caret, 1).unwrap();

        caret += tree.insert(caret, "some content here").unwrap();
        tree.insert_char(caret, '\n').unwrap();

        // jump back somewhere and edit there too
        if iteration % 10 == 0 {
            let offset = tree.offset_of(Position::new(iteration / 2, 0)).unwrap();
            tree.insert(offset, "# ").unwrap();
        }
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(2),
        "Mixed operations took {:?}, expected < 2s",
        elapsed
    );
    assert_eq!(tree.line_count(), 1001);
    tree.check_invariants().unwrap();
}

//! Sprite indexing over a WAD assembled in memory.

use std::sync::Arc;

use ftui_doom::picture::{Picture, Post};
use ftui_doom::sprites::SpriteStore;
use ftui_doom::wad::WadBuilder;
use ftui_doom::{DoomConfig, DoomError, DoomGame, WadError};

fn picture(width: usize, value: u8) -> Picture {
    Picture {
        width,
        height: 4,
        left_offset: (width / 2) as i16,
        top_offset: 4,
        columns: vec![
            vec![Post {
                top_delta: 0,
                pixels: vec![value; 4],
            }];
            width
        ],
    }
}

fn lump(width: usize, value: u8) -> Vec<u8> {
    picture(width, value).to_bytes().unwrap()
}

#[test]
fn sprites_between_markers_are_indexed() {
    let wad = WadBuilder::new()
        .lump("TROOA1", lump(3, 1))
        .marker("S_START")
        .lump("POSSA0", lump(2, 10))
        .lump("TROOA1", lump(4, 20))
        .lump("TROOA2A8", lump(5, 30))
        .lump("TROOB3", lump(6, 40))
        .marker("S_END")
        .into_wad()
        .unwrap();
    let store = SpriteStore::load(&wad).unwrap();
    assert_eq!(store.len(), 2);

    let poss = store.frame("POSS", 0).unwrap();
    for r in 0..8 {
        assert_eq!(poss.rotation(r).unwrap().picture.width, 2);
    }

    let troo = store.frame("TROO", 0).unwrap();
    assert_eq!(troo.rotation(0).unwrap().picture.width, 4);
    let front = troo.rotation(1).unwrap();
    let mirrored = troo.rotation(7).unwrap();
    assert!(!front.flip);
    assert!(mirrored.flip);
    assert!(Arc::ptr_eq(&front.picture, &mirrored.picture));
    assert!(troo.rotation(2).is_none());

    let walk = store.frame("TROO", 1).unwrap();
    assert_eq!(walk.rotation(2).unwrap().picture.columns[0][0].pixels[0], 40);
    assert!(walk.rotation(0).is_none());
}

#[test]
fn broken_sprite_lump_is_skipped() {
    let wad = WadBuilder::new()
        .marker("S_START")
        .lump("BADXA0", vec![1, 2, 3])
        .lump("SARGA0", lump(2, 5))
        .marker("S_END")
        .into_wad()
        .unwrap();
    let store = SpriteStore::load(&wad).unwrap();
    assert!(store.get("BADX").is_none());
    assert!(store.get("SARG").is_some());
}

#[test]
fn missing_sprite_markers_are_an_error() {
    let wad = WadBuilder::new().lump("POSSA0", lump(2, 1)).into_wad().unwrap();
    assert!(matches!(
        SpriteStore::load(&wad),
        Err(WadError::LumpNotFound(_))
    ));
}

#[test]
fn game_reports_missing_map() {
    let wad = WadBuilder::new()
        .marker("S_START")
        .marker("S_END")
        .into_wad()
        .unwrap();
    let err = DoomGame::from_wad(DoomConfig::default(), &wad).unwrap_err();
    assert!(matches!(err, DoomError::MapNotFound(ref name) if name == "E1M1"));
}

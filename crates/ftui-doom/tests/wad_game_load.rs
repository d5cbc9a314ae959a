//! Loading a whole game from a WAD file on disk.

use ftui_doom::wad::WadBuilder;
use ftui_doom::{DoomConfig, DoomError, DoomGame, FRACUNIT, Skill};

const NO_SIDEDEF: u16 = 0xFFFF;

fn words(vals: &[i16]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn name8(name: &str) -> [u8; 8] {
    let mut raw = [0u8; 8];
    for (d, s) in raw.iter_mut().zip(name.bytes()) {
        *d = s;
    }
    raw
}

/// A 128×128 room with the player in the middle facing north, plus the
/// palette, colormap, sprite and flat sections a game load needs.
fn square_room_wad() -> WadBuilder {
    let vertexes = words(&[0, 0, 0, 128, 128, 128, 128, 0]);
    let mut linedefs = Vec::new();
    for (a, b) in [(0u16, 1u16), (1, 2), (2, 3), (3, 0)] {
        for v in [a, b, 1, 0, 0, 0, NO_SIDEDEF] {
            linedefs.extend_from_slice(&v.to_le_bytes());
        }
    }
    let mut sidedefs = words(&[0, 0]);
    sidedefs.extend_from_slice(&name8("-"));
    sidedefs.extend_from_slice(&name8("-"));
    sidedefs.extend_from_slice(&name8("STARTAN3"));
    sidedefs.extend_from_slice(&0u16.to_le_bytes());
    let mut sectors = words(&[0, 96]);
    sectors.extend_from_slice(&name8("FLOOR4_8"));
    sectors.extend_from_slice(&name8("CEIL3_5"));
    sectors.extend_from_slice(&words(&[192, 0, 0]));
    let mut segs = Vec::new();
    for i in 0..4i16 {
        segs.extend_from_slice(&words(&[i, (i + 1) % 4, 0, i, 0, 0]));
    }

    let playpal: Vec<u8> = (0..14)
        .flat_map(|_| (0..=255u8).flat_map(|i| [i, i, i]))
        .collect();
    let colormap: Vec<u8> = (0..34).flat_map(|_| 0..=255u8).collect();

    WadBuilder::new()
        .lump("PLAYPAL", playpal)
        .lump("COLORMAP", colormap)
        .marker("MAP01")
        .lump("THINGS", words(&[64, 64, 90, 1, 7]))
        .lump("LINEDEFS", linedefs)
        .lump("SIDEDEFS", sidedefs)
        .lump("VERTEXES", vertexes)
        .lump("SEGS", segs)
        .lump("SSECTORS", words(&[4, 0]))
        .lump("NODES", Vec::new())
        .lump("SECTORS", sectors)
        .lump("REJECT", Vec::new())
        .lump("BLOCKMAP", Vec::new())
        .marker("S_START")
        .marker("S_END")
        .marker("F_START")
        .lump("FLOOR4_8", vec![100; 64 * 64])
        .lump("CEIL3_5", vec![150; 64 * 64])
        .marker("F_END")
}

fn map01() -> DoomConfig {
    DoomConfig {
        start_map: "MAP01".into(),
        ..DoomConfig::default()
    }
}

#[test]
fn game_loads_from_wad_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("square.wad");
    std::fs::write(&path, square_room_wad().build()).unwrap();

    let mut game = DoomGame::from_wad_file(map01(), &path).unwrap();
    assert_eq!(game.map().name, "MAP01");
    assert_eq!(game.map().lines.len(), 4);
    assert_eq!(
        (game.player().x, game.player().y),
        (64 * FRACUNIT, 64 * FRACUNIT)
    );

    game.start(Skill::Medium);
    assert!(game.mobjs().is_empty());
    assert!(!game.menu().is_active());
    let stats = game.render();
    assert_eq!(stats.subsectors, 1);
}

#[test]
fn missing_wad_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.wad");
    let err = DoomGame::from_wad_file(map01(), &path).unwrap_err();
    assert!(matches!(err, DoomError::Io { .. }));
    assert!(err.to_string().contains("absent.wad"));
}

//! Inventory parsing tests

use swbackup::errors::BackupError;
use swbackup::filesys::file::File;
use swbackup::inventory::{load_inventory, parse_inventory};

const INVENTORY: &str = "\
hostname;address;brand;function;command;default_credentials
# core switches
SW01;10.0.0.1;Aruba;backup;;true

SW02 ; 10.0.0.2 ; Aruba ; Backup ; ; no
SW03;10.0.0.3;HP;save;write memory;1
";

#[test]
fn test_parse_inventory() {
    let devices = parse_inventory(INVENTORY, ';').unwrap();
    assert_eq!(devices.len(), 3);

    assert_eq!(devices[0].hostname, "SW01");
    assert_eq!(devices[0].address, "10.0.0.1");
    assert_eq!(devices[0].brand, "Aruba");
    assert!(devices[0].is_backup());
    assert_eq!(devices[0].command, None);
    assert!(devices[0].use_default_credentials);

    assert_eq!(devices[1].hostname, "SW02");
    assert_eq!(devices[1].function, "backup");
    assert!(!devices[1].use_default_credentials);

    assert!(!devices[2].is_backup());
    assert_eq!(devices[2].function, "save");
    assert_eq!(devices[2].command.as_deref(), Some("write memory"));
}

#[test]
fn test_parse_inventory_with_other_delimiter() {
    let devices = parse_inventory("SW01,10.0.0.1,Cisco,backup,yes", ',').unwrap();
    assert_eq!(devices[0].brand, "Cisco");
    assert!(devices[0].use_default_credentials);
}

#[test]
fn test_duplicate_hostname_is_rejected() {
    let err = parse_inventory(
        "SW01;10.0.0.1;Aruba;backup;true\nSW01;10.0.0.2;Aruba;backup;true",
        ';',
    )
    .unwrap_err();

    assert!(matches!(err, BackupError::Inventory(_)));
    assert!(err.to_string().contains("line 2"));
    assert!(err.to_string().contains("SW01"));
}

#[test]
fn test_empty_cells_are_rejected() {
    assert!(parse_inventory(";10.0.0.1;Aruba;backup;true", ';').is_err());
    assert!(parse_inventory("SW01;;Aruba;backup;true", ';').is_err());
    assert!(parse_inventory("SW01;10.0.0.1;Aruba;backup;sometimes", ';').is_err());
}

#[test]
fn test_path_like_hostnames_are_rejected() {
    for hostname in ["../../evil", "a/b", "core\\sw1", "SW\"01", ".."] {
        let row = format!("{};10.0.0.1;Aruba;backup;true", hostname);
        let err = parse_inventory(&format!("SW00;10.0.0.9;Aruba;backup;true\n{}", row), ';')
            .unwrap_err();

        assert!(matches!(err, BackupError::Inventory(_)), "{}", hostname);
        assert!(err.to_string().contains("line 2"), "{}", err);
    }

    let devices = parse_inventory("sw-01.core_a;10.0.0.1;Aruba;backup;true", ';').unwrap();
    assert_eq!(devices[0].hostname, "sw-01.core_a");
}

#[test]
fn test_empty_inventory_is_rejected() {
    assert!(matches!(
        parse_inventory("hostname;address;brand;function;command;default\n\n# none\n", ';'),
        Err(BackupError::Inventory(_))
    ));
}

#[tokio::test]
async fn test_load_inventory() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("devices.csv"));
    std::fs::write(file.path(), INVENTORY).unwrap();

    let devices = load_inventory(&file, ';').await.unwrap();
    assert_eq!(devices.len(), 3);
}

#[tokio::test]
async fn test_load_missing_inventory() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("missing.csv"));

    assert!(matches!(
        load_inventory(&file, ';').await,
        Err(BackupError::Inventory(_))
    ));
}

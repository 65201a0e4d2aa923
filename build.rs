//! This build script copies the `memory.x` file from the crate root into
//! a directory where the linker can always find it at build time, and turns
//! the JSON files in `config/` into constants the firmware includes.
//!
//! Missing config files are created with dummy values so a fresh checkout
//! still builds.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::print_stdout)]

use std::{
    env, fs,
    fs::File,
    io,
    io::Write,
    path::{Path, PathBuf},
};

fn main() {
    memory_x();
    wifi_secrets().unwrap();
    time_sync_config().unwrap();
}

/// Read a config file from `config/`, writing `dummy` in its place if it does not exist
fn read_config(name: &str, dummy: &str) -> serde_json::Value {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR environment variable not set");
    let config_path = Path::new(&manifest_dir).join("config").join(name);
    println!("cargo:rerun-if-changed={}", config_path.display());

    let config_contents = if config_path.exists() {
        fs::read_to_string(&config_path).unwrap_or_else(|_| panic!("Could not read {name}"))
    } else {
        println!("{name} not found, creating with dummy values");
        fs::write(&config_path, dummy).unwrap_or_else(|_| panic!("Could not write dummy {name}"));
        dummy.to_string()
    };

    serde_json::from_str(&config_contents).unwrap_or_else(|_| panic!("Could not parse {name}"))
}

/// Generate `wifi_secrets.rs` from `wifi_config.json`
fn wifi_secrets() -> io::Result<()> {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR environment variable not set");
    let mut f = File::create(Path::new(&out_dir).join("wifi_secrets.rs"))?;

    let config = read_config("wifi_config.json", r#"{"ssid":"dummy","password":"dummy"}"#);
    let ssid = config["ssid"]
        .as_str()
        .expect("ssid not found in wifi_config.json file");
    let password = config["password"]
        .as_str()
        .expect("password not found in wifi_config.json file");

    writeln!(f, "/// SSID of the network used for time sync")?;
    writeln!(f, "pub const SSID: &str = {ssid:?};")?;
    writeln!(f, "/// Passphrase of the network used for time sync, empty for open networks")?;
    writeln!(f, "pub const PASSWORD: &str = {password:?};")?;
    Ok(())
}

/// Generate `time_sync_config.rs` from `time_sync.json`
fn time_sync_config() -> io::Result<()> {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR environment variable not set");
    let mut f = File::create(Path::new(&out_dir).join("time_sync_config.rs"))?;

    let config = read_config(
        "time_sync.json",
        r#"{"ntp_server":"pool.ntp.org","sync_interval_secs":3600,"retry_interval_secs":30}"#,
    );
    let server = config["ntp_server"]
        .as_str()
        .expect("ntp_server not found in time_sync.json file");
    let sync_interval = config["sync_interval_secs"].as_u64().unwrap_or(3600);
    let retry_interval = config["retry_interval_secs"].as_u64().unwrap_or(30);

    writeln!(f, "/// Host name of the NTP server")?;
    writeln!(f, "pub const NTP_SERVER: &str = {server:?};")?;
    writeln!(f, "/// Seconds between successful synchronizations")?;
    writeln!(f, "pub const SYNC_INTERVAL_SECS: u64 = {sync_interval};")?;
    writeln!(f, "/// Seconds to wait after a failed synchronization")?;
    writeln!(f, "pub const RETRY_INTERVAL_SECS: u64 = {retry_interval};")?;
    Ok(())
}

/// Handle the `memory.x` linker script
fn memory_x() {
    // Put `memory.x` in our output directory and ensure it's
    // on the linker search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(include_bytes!("memory.x"))
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());

    // Only re-run when `memory.x` or the config files change.
    println!("cargo:rerun-if-changed=memory.x");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}

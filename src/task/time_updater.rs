//! # Time Updater Task
//! This module contains the task that keeps a fresh NTP sample for the main loop.
//! The task is responsible for connecting to a wifi network, asking an NTP server for the time,
//! and storing the answer together with the instant it arrived.
//!
//! # populate constants SSID and PASSWORD
//! make sure to have a wifi_config.json file in the config folder formatted as follows:
//!```json
//!  {
//!     "ssid": "some_ssid_here",
//!     "password": "some_password_here"
//! }
//! ```
//! an empty password joins an open network.
//!
//! # populate constants NTP_SERVER, SYNC_INTERVAL_SECS and RETRY_INTERVAL_SECS
//! make sure to have a time_sync.json file in the config folder formatted as follows:
//! ```json
//! {
//!     "ntp_server": "pool.ntp.org",
//!     "sync_interval_secs": 3600,
//!     "retry_interval_secs": 30
//! }
//! ```

include!(concat!(env!("OUT_DIR"), "/wifi_secrets.rs"));
include!(concat!(env!("OUT_DIR"), "/time_sync_config.rs"));

use crate::task::resources::{Irqs, WifiResources};
use core::cell::Cell;
use cyw43::JoinOptions;
use cyw43_pio::{DEFAULT_CLOCK_DIVIDER, PioSpi};
use defmt::{error, info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{Config, DhcpConfig, Stack, StackResources};
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_rp::pio::Pio;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant, Timer, with_timeout};
use medibox_core::clock::ClockState;
use medibox_core::ntp::{self, NTP_PORT, NtpError, PACKET_LEN};
use medibox_core::traits::{TimeAuthority, TimeAuthorityUnavailable};
use rand::RngCore;
use static_cell::StaticCell;

/// A sample older than this no longer counts as network time
const MAX_SAMPLE_AGE: Duration = Duration::from_secs(25 * 3600);

/// One answer from the NTP server
#[derive(Clone, Copy)]
struct NtpSample {
    /// Seconds since the unix epoch, UTC
    unix_seconds: u64,
    /// When the answer arrived
    at: Instant,
}

/// The latest sample, written by the updater task and read by the main loop
static LATEST_SAMPLE: Mutex<CriticalSectionRawMutex, Cell<Option<NtpSample>>> =
    Mutex::new(Cell::new(None));

/// Why one synchronization attempt failed
#[derive(Debug, defmt::Format)]
enum SyncError {
    /// Association did not finish in time
    JoinTimeout,
    /// The access point refused us
    Join(u32),
    /// No DHCP lease
    Dhcp,
    /// Host name did not resolve
    Dns,
    /// Socket could not be bound
    Bind,
    /// Request could not be sent
    Send,
    /// No reply in time
    ReceiveTimeout,
    /// Receive failed
    Receive,
    /// Reply was not usable
    Reply(NtpError),
}

/// Settings for the updater loop
pub struct TimeUpdater {
    /// Network to join
    ssid: &'static str,
    /// Passphrase, empty for an open network
    password: &'static str,
    /// NTP host name
    server: &'static str,
    /// Seconds to wait after a successful sync
    refresh_after_secs: u64,
    /// Seconds to wait after a failed attempt
    retry_after_secs: u64,
    /// Longest wait for joining the network
    timeout_duration: Duration,
}

impl Default for TimeUpdater {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeUpdater {
    /// Settings from the generated configuration constants
    pub const fn new() -> Self {
        Self {
            ssid: SSID,
            password: PASSWORD,
            server: NTP_SERVER,
            refresh_after_secs: SYNC_INTERVAL_SECS,
            retry_after_secs: RETRY_INTERVAL_SECS,
            timeout_duration: Duration::from_secs(10),
        }
    }

    /// Open or WPA join depending on the passphrase
    fn join_options(&self) -> JoinOptions<'static> {
        if self.password.is_empty() {
            JoinOptions::new_open()
        } else {
            JoinOptions::new(self.password.as_bytes())
        }
    }

    /// Join, wait for a lease, ask the server. Leaves the network in every case.
    async fn synchronize(
        &self,
        control: &mut cyw43::Control<'static>,
        stack: Stack<'static>,
    ) -> Result<u64, SyncError> {
        info!("Joining network with SSID: {}", self.ssid);
        let join_result = with_timeout(
            self.timeout_duration,
            control.join(self.ssid, self.join_options()),
        )
        .await;
        match join_result {
            Ok(Ok(())) => {
                control.gpio_set(0, true).await; // Turn on the onboard LED
                info!("Connected to wifi");
            }
            Ok(Err(e)) => return Err(SyncError::Join(e.status)),
            Err(_) => return Err(SyncError::JoinTimeout),
        }

        let result = self.query(stack).await;

        control.leave().await;
        control.gpio_set(0, false).await; // Turn off the onboard LED
        info!("Disconnected from wifi");
        result
    }

    /// One NTP exchange over an already joined network
    async fn query(&self, stack: Stack<'static>) -> Result<u64, SyncError> {
        with_timeout(Duration::from_secs(15), stack.wait_config_up())
            .await
            .map_err(|_| SyncError::Dhcp)?;

        let addresses = stack
            .dns_query(self.server, DnsQueryType::A)
            .await
            .map_err(|_| SyncError::Dns)?;
        let address = *addresses.first().ok_or(SyncError::Dns)?;

        let mut rx_meta = [PacketMetadata::EMPTY; 1];
        let mut rx_buffer = [0u8; 256];
        let mut tx_meta = [PacketMetadata::EMPTY; 1];
        let mut tx_buffer = [0u8; 256];
        let mut socket = UdpSocket::new(
            stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| SyncError::Bind)?;

        let request = ntp::request_packet();
        socket
            .send_to(&request, (address, NTP_PORT))
            .await
            .map_err(|_| SyncError::Send)?;

        let mut reply = [0u8; PACKET_LEN];
        let (len, _) = with_timeout(Duration::from_secs(3), socket.recv_from(&mut reply))
            .await
            .map_err(|_| SyncError::ReceiveTimeout)?
            .map_err(|_| SyncError::Receive)?;

        ntp::parse_response(&reply[..len]).map_err(SyncError::Reply)
    }
}

#[embassy_executor::task]
async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}

#[embassy_executor::task]
pub async fn time_updater(spawner: Spawner, r: WifiResources) {
    info!("time updater task started");

    info!("init wifi");
    let pwr = Output::new(r.pwr_pin, Level::Low);
    let cs = Output::new(r.cs_pin, Level::High);
    let mut pio = Pio::new(r.pio_sm, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        r.dio_pin,
        r.clk_pin,
        r.dma_ch,
    );

    let time_updater = TimeUpdater::new();

    // firmware blobs flashed separately with probe-rs, see README
    let fw = unsafe { core::slice::from_raw_parts(0x1010_0000 as *const u8, 230_321) };
    let clm = unsafe { core::slice::from_raw_parts(0x1014_0000 as *const u8, 4752) };

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());

    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;

    unwrap!(spawner.spawn(cyw43_task(runner)));

    info!("init control");
    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;

    let mut dhcp_config = DhcpConfig::default();
    dhcp_config.hostname = heapless::String::try_from("medibox").ok();
    let config = Config::dhcpv4(dhcp_config);

    // random seed
    let seed = RoscRng.next_u64();

    // Initialize the network stack
    static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        net_device,
        config,
        RESOURCES.init(StackResources::new()),
        seed,
    );

    unwrap!(spawner.spawn(net_task(runner)));

    info!("starting loop");
    '_mainloop: loop {
        let wait_secs = match time_updater.synchronize(&mut control, stack).await {
            Ok(unix_seconds) => {
                info!("NTP time received: {} s since epoch", unix_seconds);
                LATEST_SAMPLE.lock(|sample| {
                    sample.set(Some(NtpSample {
                        unix_seconds,
                        at: Instant::now(),
                    }));
                });
                time_updater.refresh_after_secs
            }
            Err(e) => {
                error!(
                    "Time sync failed, retrying in {} seconds: {}",
                    time_updater.retry_after_secs, e
                );
                time_updater.retry_after_secs
            }
        };

        info!("Waiting for {} seconds before reconnecting", wait_secs);
        Timer::after(Duration::from_secs(wait_secs)).await;
    }
}

/// The main loop's view of the updater: the latest sample, projected to now
pub struct NtpTimeAuthority {
    /// The current sample has already been reported as too old
    stale_reported: bool,
}

impl NtpTimeAuthority {
    /// Authority over the samples of the time updater task
    pub const fn new() -> Self {
        Self {
            stale_reported: false,
        }
    }
}

impl TimeAuthority for NtpTimeAuthority {
    #[allow(clippy::cast_possible_wrap)]
    async fn fetch(&mut self, offset_seconds: i32) -> Result<ClockState, TimeAuthorityUnavailable> {
        let sample = LATEST_SAMPLE
            .lock(Cell::get)
            .ok_or(TimeAuthorityUnavailable)?;
        let age = sample.at.elapsed();
        if age > MAX_SAMPLE_AGE {
            if !self.stale_reported {
                warn!("NTP sample is {} s old, ignoring it", age.as_secs());
                self.stale_reported = true;
            }
            return Err(TimeAuthorityUnavailable);
        }
        self.stale_reported = false;
        let utc = sample.unix_seconds as i64 + (age.as_millis() / 1000) as i64;
        let local = utc + i64::from(offset_seconds);
        Ok(ClockState::from_unix_seconds(local))
    }
}

impl Default for NtpTimeAuthority {
    fn default() -> Self {
        Self::new()
    }
}

//! Interactive vehicle shell
//!
//! Two phases:
//!
//! ```text
//!  setup ──(scan | pair | check)──► interactive loop ──(exit | EOF)──► disconnect
//!    │                                   │   ▲
//!    └──(no vehicles, bad choice,        │   │ help / check / vehicle action /
//!        connect failure, bad VIN)       └───┘ unrecognized
//!          ▼
//!        report and stop
//! ```
//!
//! At most one vehicle is live. It is owned by a [`VehicleSession`] that is
//! moved into the loop and closed exactly once when the loop ends.

use crate::domain::command::{ShellCommand, VehicleAction};
use crate::domain::error::{SetupError, VehicleError};
use crate::domain::models::ScannedDevice;
use crate::domain::vehicle::{Vehicle, VehicleLink, VehicleSession};
use crate::domain::vin::{check_vin, verdict_message, Compatibility, VinError};
use crate::presentation::cli::SetupRequest;
use crate::presentation::input::LineSource;
use std::io::{self, Write};
use tracing::{debug, info, warn};

pub const COMMAND_PROMPT: &str = "Enter a command (type 'help' for options, 'exit' to quit): ";
pub const VIN_PROMPT: &str = "Enter a VIN to check: ";
pub const CHOICE_PROMPT: &str = "Enter choice: ";

#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    /// Tell the user about tokens that match no command instead of ignoring them
    pub warn_on_unknown_command: bool,
    pub help_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct Shell<L, W> {
    input: L,
    output: W,
    options: ShellOptions,
}

impl<L: LineSource, W: Write> Shell<L, W> {
    pub fn new(input: L, output: W, options: ShellOptions) -> Self {
        Self {
            input,
            output,
            options,
        }
    }

    /// Setup phase
    ///
    /// `open_link` is only called for scan and pair, so `check` and the
    /// pre-pairing refusal work without a Bluetooth stack.
    /// `Ok(None)` continues into the loop without a vehicle (scan, check).
    pub fn setup<K, F>(
        &mut self,
        open_link: F,
        request: SetupRequest,
    ) -> Result<Option<VehicleSession<K::Vehicle>>, SetupError>
    where
        K: VehicleLink,
        F: FnOnce() -> Result<K, VehicleError>,
    {
        info!("Setup: {:?}", request);
        match request {
            SetupRequest::Scan => {
                let mut link = open_link().map_err(SetupError::BluetoothUnavailable)?;
                self.scan_and_list(&mut link)?;
                Ok(None)
            }
            SetupRequest::Check { vin } => {
                let verdict = check_vin(&vin)?;
                self.print_verdict(&vin, verdict)?;
                Ok(None)
            }
            SetupRequest::Pair {
                address: Some(address),
            } => {
                let mut link = open_link().map_err(SetupError::BluetoothUnavailable)?;
                let session = connect(&mut link, &address)?;
                if let Some(vehicle) = session.vehicle() {
                    writeln!(self.output, "Paired with {} at {}", vehicle.name(), address)?;
                }
                Ok(Some(session))
            }
            SetupRequest::Pair { address: None } => {
                let mut link = open_link().map_err(SetupError::BluetoothUnavailable)?;
                let devices = self.scan_and_list(&mut link)?;
                let selected = self.choose(&devices)?;
                let session = connect(&mut link, &selected.address)?;
                if let Some(vehicle) = session.vehicle() {
                    writeln!(self.output, "Paired with {}", vehicle.name())?;
                }
                Ok(Some(session))
            }
            SetupRequest::Vehicle(action) => {
                debug!("'{}' requested before pairing", action);
                Err(SetupError::NotPaired)
            }
        }
    }

    /// Print why setup stopped the run
    pub fn report(&mut self, error: &SetupError) -> io::Result<()> {
        match error {
            SetupError::ConnectFailed(source)
            | SetupError::ScanFailed(source)
            | SetupError::BluetoothUnavailable(source) => {
                warn!("{} ({})", error, source)
            }
            SetupError::InvalidChoice(input) => info!("Invalid choice {:?}", input),
            SetupError::InvalidVin(VinError::InvalidLength { length, .. }) => {
                info!("VIN rejected, {} characters", length)
            }
            _ => info!("Setup stopped: {}", error),
        }
        writeln!(self.output, "{}", error)
    }

    /// Interactive phase
    ///
    /// Runs until `exit` or end of input, then disconnects the vehicle if
    /// one is paired. An I/O error drops the session, which still
    /// disconnects it.
    pub fn run<V: Vehicle>(&mut self, mut session: Option<VehicleSession<V>>) -> io::Result<()> {
        while let Some(line) = self.input.read_line(COMMAND_PROMPT)? {
            let command = ShellCommand::parse(&line);
            if self.dispatch(command, session.as_mut())? == Flow::Exit {
                break;
            }
        }

        if let Some(session) = session.take() {
            writeln!(self.output, "Disconnecting...")?;
            match session.close() {
                Ok(_) => writeln!(self.output, "Vehicle disconnected successfully")?,
                Err(e) => {
                    warn!("Disconnect failed: {}", e);
                    writeln!(self.output, "Disconnect failed: {}", e)?;
                }
            }
        }
        Ok(())
    }

    fn dispatch<V: Vehicle>(
        &mut self,
        command: ShellCommand,
        session: Option<&mut VehicleSession<V>>,
    ) -> io::Result<Flow> {
        debug!("Dispatching {:?}", command);
        match command {
            ShellCommand::Exit => return Ok(Flow::Exit),
            ShellCommand::Help => {
                writeln!(self.output, "{}", self.options.help_text)?;
            }
            ShellCommand::Check => {
                let Some(input) = self.input.read_line(VIN_PROMPT)? else {
                    return Ok(Flow::Exit);
                };
                match check_vin(&input) {
                    Ok(verdict) => self.print_verdict(&input, verdict)?,
                    Err(e) => writeln!(self.output, "{}", e)?,
                }
            }
            ShellCommand::Vehicle(action) => {
                match session.and_then(|session| session.vehicle_mut()) {
                    Some(vehicle) => {
                        if let Err(e) = apply(vehicle, action) {
                            warn!("'{}' failed: {}", action, e);
                            writeln!(self.output, "{} failed: {}", action, e)?;
                        }
                    }
                    None => debug!("No vehicle paired, ignoring '{}'", action),
                }
            }
            // Silent by default; a typo gives no feedback unless enabled
            ShellCommand::Unrecognized(token) => {
                debug!("Ignoring unrecognized command '{}'", token);
                if self.options.warn_on_unknown_command && !token.is_empty() {
                    writeln!(
                        self.output,
                        "Unknown command '{}'. Type 'help' for options.",
                        token
                    )?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn scan_and_list<K: VehicleLink>(
        &mut self,
        link: &mut K,
    ) -> Result<Vec<ScannedDevice>, SetupError> {
        let devices = link.scan().map_err(SetupError::ScanFailed)?;
        if devices.is_empty() {
            return Err(SetupError::NoVehiclesFound);
        }
        for (i, device) in devices.iter().enumerate() {
            writeln!(self.output, "{}: {}", i, device)?;
        }
        Ok(devices)
    }

    fn choose<'a>(&mut self, devices: &'a [ScannedDevice]) -> Result<&'a ScannedDevice, SetupError> {
        let input = self
            .input
            .read_line(CHOICE_PROMPT)?
            .ok_or_else(|| SetupError::InvalidChoice(String::new()))?;

        let index = input.trim().parse::<usize>().ok();
        index
            .and_then(|index| devices.get(index))
            .ok_or(SetupError::InvalidChoice(input))
    }

    fn print_verdict(&mut self, vin: &str, verdict: Compatibility) -> io::Result<()> {
        info!("VIN {} is {}", vin, verdict);
        writeln!(self.output, "{}", verdict_message(vin, verdict))
    }
}

/// Connect and take ownership of the handle right away so every failure
/// path below still releases it
fn connect<K: VehicleLink>(
    link: &mut K,
    address: &str,
) -> Result<VehicleSession<K::Vehicle>, SetupError> {
    let session = VehicleSession::new(link.connect(address).map_err(SetupError::ConnectFailed)?);
    match session.vehicle() {
        Some(vehicle) if vehicle.is_connected() => Ok(session),
        _ => Err(SetupError::ConnectFailed(VehicleError::NotConnected)),
    }
}

fn apply<V: Vehicle>(vehicle: &mut V, action: VehicleAction) -> Result<(), VehicleError> {
    match action {
        VehicleAction::Lock => vehicle.lock(),
        VehicleAction::Unlock => vehicle.unlock(),
        VehicleAction::OpenTrunk => vehicle.open_trunk(),
        VehicleAction::OpenFrunk => vehicle.open_frunk(),
        VehicleAction::OpenChargePort => vehicle.open_charge_port(),
        VehicleAction::CloseChargePort => vehicle.close_charge_port(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle::testing::FakeLink;
    use crate::presentation::input::testing::ScriptedLines;

    const ADDRESS: &str = "AA:BB:CC:DD:EE:01";

    struct Run {
        output: String,
        prompts: Vec<String>,
        unread: usize,
        link_opened: bool,
    }

    /// Setup then loop, the way `main` drives the shell
    fn drive(
        link: &mut FakeLink,
        request: SetupRequest,
        lines: &[&str],
        options: ShellOptions,
    ) -> Run {
        let mut shell = Shell::new(ScriptedLines::new(lines), Vec::new(), options);
        let mut link_opened = false;
        let open_link = || {
            link_opened = true;
            Ok::<_, VehicleError>(link)
        };
        match shell.setup(open_link, request) {
            Ok(session) => shell.run(session).unwrap(),
            Err(e) => shell.report(&e).unwrap(),
        }
        let Shell { input, output, .. } = shell;
        Run {
            output: String::from_utf8(output).unwrap(),
            prompts: input.prompts.clone(),
            unread: input.remaining(),
            link_opened,
        }
    }

    fn pair(address: &str) -> SetupRequest {
        SetupRequest::Pair {
            address: Some(address.to_string()),
        }
    }

    #[test]
    fn test_pair_then_commands_then_exit() {
        let mut link = FakeLink::with_devices(2);
        let run = drive(
            &mut link,
            pair(ADDRESS),
            &["lock", "Charge Open", "trunk", "exit"],
            ShellOptions::default(),
        );

        let calls = link.calls.borrow();
        assert_eq!(
            calls.actions,
            vec![
                VehicleAction::Lock,
                VehicleAction::OpenChargePort,
                VehicleAction::OpenTrunk
            ]
        );
        assert_eq!(calls.disconnects, 1);
        assert!(run
            .output
            .starts_with("Paired with S0000000000000001C at AA:BB:CC:DD:EE:01\n"));
        assert!(run
            .output
            .ends_with("Disconnecting...\nVehicle disconnected successfully\n"));
    }

    #[test]
    fn test_exit_without_commands_disconnects_once() {
        let mut link = FakeLink::with_devices(1);
        drive(&mut link, pair(ADDRESS), &["exit"], ShellOptions::default());
        let calls = link.calls.borrow();
        assert!(calls.actions.is_empty());
        assert_eq!(calls.disconnects, 1);
    }

    #[test]
    fn test_end_of_input_ends_loop() {
        let mut link = FakeLink::with_devices(1);
        let run = drive(&mut link, pair(ADDRESS), &["unlock"], ShellOptions::default());
        assert_eq!(link.calls.borrow().disconnects, 1);
        assert_eq!(run.prompts, vec![COMMAND_PROMPT, COMMAND_PROMPT]);
    }

    #[test]
    fn test_unrecognized_is_silent_and_loop_continues() {
        let mut link = FakeLink::with_devices(1);
        let run = drive(
            &mut link,
            pair(ADDRESS),
            &["open sunroof", "lock", "exit"],
            ShellOptions::default(),
        );
        assert_eq!(link.calls.borrow().actions, vec![VehicleAction::Lock]);
        assert!(!run.output.contains("sunroof"));
        assert_eq!(run.unread, 0);
    }

    #[test]
    fn test_unrecognized_warning_when_enabled() {
        let mut link = FakeLink::with_devices(1);
        let options = ShellOptions {
            warn_on_unknown_command: true,
            ..Default::default()
        };
        let run = drive(&mut link, pair(ADDRESS), &["lokc", "", "exit"], options);
        assert!(run
            .output
            .contains("Unknown command 'lokc'. Type 'help' for options.\n"));
        assert_eq!(run.output.matches("Unknown command").count(), 1);
        assert_eq!(link.calls.borrow().disconnects, 1);
    }

    #[test]
    fn test_help_prints_reference() {
        let mut link = FakeLink::with_devices(1);
        let options = ShellOptions {
            help_text: "usage: lock | unlock".to_string(),
            ..Default::default()
        };
        let run = drive(&mut link, pair(ADDRESS), &["HELP", "exit"], options);
        assert!(run.output.contains("usage: lock | unlock\n"));
    }

    #[test]
    fn test_interactive_check() {
        let mut link = FakeLink::with_devices(1);
        let run = drive(
            &mut link,
            pair(ADDRESS),
            &["check", "7YJXE1E17MF000316", "check", "short", "exit"],
            ShellOptions::default(),
        );
        assert!(run.output.contains("7YJXE1E17MF000316 is incompatible!\n"));
        assert!(run.output.contains("short is not a valid VIN.\n"));
        assert_eq!(
            run.prompts,
            vec![
                COMMAND_PROMPT,
                VIN_PROMPT,
                COMMAND_PROMPT,
                VIN_PROMPT,
                COMMAND_PROMPT
            ]
        );
    }

    #[test]
    fn test_action_failure_is_reported_and_loop_continues() {
        let mut link = FakeLink::with_devices(1);
        link.fail_actions = true;
        let run = drive(
            &mut link,
            pair(ADDRESS),
            &["lock", "unlock", "exit"],
            ShellOptions::default(),
        );
        assert!(run
            .output
            .contains("lock failed: no command signer configured, cannot send 'lock'\n"));
        assert_eq!(link.calls.borrow().actions.len(), 2);
        assert_eq!(link.calls.borrow().disconnects, 1);
    }

    #[test]
    fn test_connect_failure_aborts() {
        let mut link = FakeLink::with_devices(1);
        link.refuse_connect = true;
        let run = drive(&mut link, pair(ADDRESS), &["lock", "exit"], ShellOptions::default());
        assert_eq!(run.output, "Failed to connect.\n");
        assert_eq!(run.unread, 2);
        assert!(run.prompts.is_empty());
    }

    #[test]
    fn test_pair_by_choice() {
        let mut link = FakeLink::with_devices(3);
        let run = drive(
            &mut link,
            SetupRequest::Pair { address: None },
            &["1", "frunk", "exit"],
            ShellOptions::default(),
        );
        assert!(run.output.starts_with(
            "0: S0000000000000000C [AA:BB:CC:DD:EE:00]\n\
             1: S0000000000000001C [AA:BB:CC:DD:EE:01]\n\
             2: S0000000000000002C [AA:BB:CC:DD:EE:02]\n\
             Paired with S0000000000000001C\n"
        ));
        let calls = link.calls.borrow();
        assert_eq!(calls.connects, vec!["AA:BB:CC:DD:EE:01".to_string()]);
        assert_eq!(calls.actions, vec![VehicleAction::OpenFrunk]);
        assert_eq!(calls.disconnects, 1);
        assert_eq!(run.prompts[0], CHOICE_PROMPT);
    }

    #[test]
    fn test_pair_by_choice_rejects_bad_index() {
        for choice in ["7", "one", "-1"] {
            let mut link = FakeLink::with_devices(2);
            let run = drive(
                &mut link,
                SetupRequest::Pair { address: None },
                &[choice, "exit"],
                ShellOptions::default(),
            );
            assert!(run.output.ends_with("Invalid choice.\n"), "{choice}");
            assert!(link.calls.borrow().connects.is_empty());
        }
    }

    #[test]
    fn test_pair_without_vehicles_aborts() {
        let mut link = FakeLink::default();
        let run = drive(
            &mut link,
            SetupRequest::Pair { address: None },
            &["0"],
            ShellOptions::default(),
        );
        assert_eq!(run.output, "No vehicles found.\n");
        assert_eq!(run.unread, 1);
    }

    #[test]
    fn test_scan_lists_then_runs_without_vehicle() {
        let mut link = FakeLink::with_devices(2);
        let run = drive(
            &mut link,
            SetupRequest::Scan,
            &["lock", "exit"],
            ShellOptions::default(),
        );
        assert!(run.output.starts_with(
            "0: S0000000000000000C [AA:BB:CC:DD:EE:00]\n1: S0000000000000001C [AA:BB:CC:DD:EE:01]\n"
        ));
        assert!(!run.output.contains("Disconnecting"));
        let calls = link.calls.borrow();
        assert!(calls.actions.is_empty());
        assert_eq!(calls.disconnects, 0);
        assert_eq!(run.unread, 0);
    }

    #[test]
    fn test_scan_without_vehicles_aborts() {
        let mut link = FakeLink::default();
        let run = drive(&mut link, SetupRequest::Scan, &["exit"], ShellOptions::default());
        assert_eq!(run.output, "No vehicles found.\n");
        assert_eq!(run.unread, 1);
    }

    #[test]
    fn test_check_request() {
        let mut link = FakeLink::default();
        let run = drive(
            &mut link,
            SetupRequest::Check {
                vin: "5YJ3E1EA7LF000316".to_string(),
            },
            &["exit"],
            ShellOptions::default(),
        );
        assert_eq!(run.output, "5YJ3E1EA7LF000316 is compatible!\n");
        assert_eq!(run.unread, 0);
        assert!(!run.link_opened);
        assert_eq!(link.calls.borrow().scans, 0);
    }

    #[test]
    fn test_check_request_with_invalid_vin_aborts() {
        let mut link = FakeLink::default();
        let run = drive(
            &mut link,
            SetupRequest::Check {
                vin: "5YJ3".to_string(),
            },
            &["exit"],
            ShellOptions::default(),
        );
        assert_eq!(run.output, "5YJ3 is not a valid VIN.\n");
        assert_eq!(run.unread, 1);
        assert!(!run.link_opened);
    }

    #[test]
    fn test_vehicle_request_before_pairing() {
        let mut link = FakeLink::with_devices(1);
        let run = drive(
            &mut link,
            SetupRequest::Vehicle(VehicleAction::Unlock),
            &["exit"],
            ShellOptions::default(),
        );
        assert_eq!(run.output, "Please scan and pair with a vehicle first.\n");
        assert!(link.calls.borrow().connects.is_empty());
        assert!(!run.link_opened);
    }

    #[test]
    fn test_check_runs_without_bluetooth() {
        let mut shell = Shell::new(ScriptedLines::new(&["exit"]), Vec::new(), ShellOptions::default());
        let session = shell
            .setup(
                || -> Result<FakeLink, VehicleError> { panic!("check must not open Bluetooth") },
                SetupRequest::Check {
                    vin: "7YJXE1EA7MF000316".to_string(),
                },
            )
            .unwrap();
        assert!(session.is_none());
        shell.run(session).unwrap();
        assert_eq!(
            String::from_utf8(shell.output).unwrap(),
            "7YJXE1EA7MF000316 is compatible!\n"
        );
    }

    #[test]
    fn test_missing_adapter_stops_scan_and_pair() {
        for request in [SetupRequest::Scan, SetupRequest::Pair { address: None }, pair(ADDRESS)] {
            let mut shell =
                Shell::new(ScriptedLines::new(&["exit"]), Vec::new(), ShellOptions::default());
            let err = shell
                .setup(|| Err::<FakeLink, _>(VehicleError::NoAdapter), request)
                .unwrap_err();
            assert!(matches!(err, SetupError::BluetoothUnavailable(VehicleError::NoAdapter)));
            assert_eq!(err.to_string(), "Bluetooth unavailable: no Bluetooth adapter available");
            assert_eq!(shell.input.remaining(), 1);
        }
    }
}

//! # Simulation gateway
//!
//! A channel-backed [`Gateway`] implementation with no real transport behind
//! it. Connection state changes are reported through the same event channel a
//! radio-backed gateway would use, telemetry is injected by the test or
//! simulation driving the gateway, and every parameter write is journalled so
//! it can be inspected afterwards.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

// Internal
use crate::gateway::{Gateway, LinkError, LinkEvent, ParamValue, TmConfig, TmHandle};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulated vehicle link.
pub struct SimGateway {
    /// Variables the simulated vehicle exposes for telemetry subscription.
    variables: Vec<String>,

    /// Accepted subscriptions, indexed by handle.
    subscriptions: Vec<TmConfig>,

    /// Journal of every parameter write issued over the link.
    param_writes: Vec<(String, ParamValue)>,

    event_sender: Sender<LinkEvent>,
    event_receiver: Option<Receiver<LinkEvent>>,

    uri: Option<String>,
    connected: bool,

    /// Parameters whose writes are made to fail, simulating a flaky link.
    failing_params: Vec<String>,

    /// Number of times `close` has actually closed the link.
    num_closes: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimGateway {
    /// Create a new simulated link exposing the given telemetry variables.
    pub fn new(variables: &[&str]) -> Self {
        let (event_sender, event_receiver) = channel();

        SimGateway {
            variables: variables.iter().map(|v| v.to_string()).collect(),
            subscriptions: Vec::new(),
            param_writes: Vec::new(),
            event_sender,
            event_receiver: Some(event_receiver),
            uri: None,
            connected: false,
            failing_params: Vec::new(),
            num_closes: 0,
        }
    }

    /// Inject a telemetry frame for the given subscription, as the vehicle
    /// would deliver it.
    pub fn inject_tm(&self, handle: TmHandle, timestamp_ms: u32, values: &[(&str, f64)]) {
        let values: HashMap<String, f64> = values
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();

        self.event_sender
            .send(LinkEvent::TmData {
                handle,
                timestamp_ms,
                values,
            })
            .ok();
    }

    /// Inject a telemetry error for the given subscription.
    pub fn inject_tm_error(&self, handle: TmHandle, message: &str) {
        self.event_sender
            .send(LinkEvent::TmError {
                handle,
                message: message.to_string(),
            })
            .ok();
    }

    /// Drop the link as if the radio went out of range.
    pub fn drop_link(&mut self, reason: &str) {
        if let Some(uri) = self.uri.clone() {
            self.connected = false;
            self.event_sender
                .send(LinkEvent::ConnectionLost {
                    uri,
                    reason: reason.to_string(),
                })
                .ok();
        }
    }

    /// Make every write to the named parameter fail, as a flaky radio would.
    ///
    /// Failed writes are not journalled.
    pub fn fail_param_writes(&mut self, name: &str) {
        self.failing_params.push(name.to_string());
    }

    /// The journal of parameter writes issued so far, oldest first.
    pub fn param_writes(&self) -> &[(String, ParamValue)] {
        &self.param_writes
    }

    /// The most recent write to the named parameter, if any.
    pub fn last_param(&self, name: &str) -> Option<&ParamValue> {
        self.param_writes
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of times the link has been closed.
    pub fn num_closes(&self) -> usize {
        self.num_closes
    }
}

impl Gateway for SimGateway {
    fn connect(&mut self, uri: &str) -> Result<(), LinkError> {
        self.uri = Some(uri.to_string());
        self.connected = true;

        self.event_sender
            .send(LinkEvent::Connected {
                uri: uri.to_string(),
            })
            .map_err(|_| LinkError::ChannelClosed)
    }

    fn close(&mut self) {
        if self.connected {
            self.connected = false;
            self.num_closes += 1;

            if let Some(uri) = self.uri.clone() {
                self.event_sender
                    .send(LinkEvent::Disconnected { uri })
                    .ok();
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, config: TmConfig) -> Result<TmHandle, LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }

        // Unknown variables are rejected, matching a real link's variable
        // table lookup
        if !self.variables.contains(&config.variable) {
            return Err(LinkError::ConfigInvalid(config.variable));
        }

        debug!(
            "SimGateway: subscribed to {} at {} ms",
            config.variable, config.period_ms
        );

        self.subscriptions.push(config);
        Ok(TmHandle(self.subscriptions.len() - 1))
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }

        if self.failing_params.iter().any(|n| n == name) {
            return Err(LinkError::NotConnected);
        }

        debug!("SimGateway: {} <- {:?}", name, value);
        self.param_writes.push((name.to_string(), value));
        Ok(())
    }

    fn take_event_receiver(&mut self) -> Option<Receiver<LinkEvent>> {
        self.event_receiver.take()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_subscribe_unknown_variable_rejected() {
        let mut link = SimGateway::new(&["stabilizer.yaw"]);
        link.connect("radio://0/83/2M").unwrap();

        let result = link.subscribe(TmConfig {
            variable: "stabilizer.pitch".into(),
            var_type: crate::gateway::TmVarType::Float,
            period_ms: 20,
        });

        match result {
            Err(LinkError::ConfigInvalid(var)) => assert_eq!(var, "stabilizer.pitch"),
            other => panic!("expected ConfigInvalid, got {:?}", other.map(|h| h.0)),
        }
    }

    #[test]
    fn test_failing_param_write() {
        let mut link = SimGateway::new(&[]);
        link.connect("radio://0/83/2M").unwrap();
        link.fail_param_writes("motorPowerSet.m2");

        link.set_param("motorPowerSet.m1", ParamValue::Uint(1)).unwrap();
        assert!(link.set_param("motorPowerSet.m2", ParamValue::Uint(1)).is_err());

        // The failed write must not appear in the journal
        assert_eq!(link.param_writes().len(), 1);
        assert!(link.last_param("motorPowerSet.m2").is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut link = SimGateway::new(&[]);
        link.connect("radio://0/83/2M").unwrap();

        link.close();
        link.close();

        assert!(!link.is_connected());
        assert_eq!(link.num_closes(), 1);
    }

    #[test]
    fn test_events_delivered_in_order() {
        let mut link = SimGateway::new(&["pm.vbat"]);
        let rx = link.take_event_receiver().unwrap();

        link.connect("radio://0/83/2M").unwrap();
        let handle = link
            .subscribe(TmConfig {
                variable: "pm.vbat".into(),
                var_type: crate::gateway::TmVarType::Float,
                period_ms: 20,
            })
            .unwrap();
        link.inject_tm(handle, 100, &[("pm.vbat", 3.7)]);
        link.close();

        match rx.try_recv().unwrap() {
            LinkEvent::Connected { uri } => assert_eq!(uri, "radio://0/83/2M"),
            e => panic!("expected Connected, got {:?}", e),
        }
        match rx.try_recv().unwrap() {
            LinkEvent::TmData { values, .. } => assert_eq!(values["pm.vbat"], 3.7),
            e => panic!("expected TmData, got {:?}", e),
        }
        match rx.try_recv().unwrap() {
            LinkEvent::Disconnected { .. } => (),
            e => panic!("expected Disconnected, got {:?}", e),
        }
    }
}

//! The ctl vocabulary.
//!
//! [`Request`] mirrors the numeric libopus request codes; [`Ctl`] is the
//! same set with arguments attached. [`dispatch`] routes a `Ctl` to the
//! matching [`Session`] method and converts between raw `i32` protocol
//! values and typed parameters. Raw codes only appear at this boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::params::Bitrate;
use crate::session::{Role, Session};
use crate::toc::Bandwidth;

/// Whether a request reads, writes or acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Get,
    Set,
    Action,
}

/// ctl request codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    SetBitrate,
    GetBitrate,
    SetMaxBandwidth,
    GetMaxBandwidth,
    SetComplexity,
    GetComplexity,
    SetInbandFec,
    GetInbandFec,
    SetPacketLossPerc,
    GetPacketLossPerc,
    SetDtx,
    GetDtx,
    ResetState,
    GetSampleRate,
    GetLastPacketDuration,
    GetInDtx,
}

impl Request {
    pub const ALL: [Request; 16] = [
        Request::SetBitrate,
        Request::GetBitrate,
        Request::SetMaxBandwidth,
        Request::GetMaxBandwidth,
        Request::SetComplexity,
        Request::GetComplexity,
        Request::SetInbandFec,
        Request::GetInbandFec,
        Request::SetPacketLossPerc,
        Request::GetPacketLossPerc,
        Request::SetDtx,
        Request::GetDtx,
        Request::ResetState,
        Request::GetSampleRate,
        Request::GetLastPacketDuration,
        Request::GetInDtx,
    ];

    /// Returns the libopus request code.
    pub fn code(&self) -> i32 {
        match self {
            Self::SetBitrate => 4002,
            Self::GetBitrate => 4003,
            Self::SetMaxBandwidth => 4004,
            Self::GetMaxBandwidth => 4005,
            Self::SetComplexity => 4010,
            Self::GetComplexity => 4011,
            Self::SetInbandFec => 4012,
            Self::GetInbandFec => 4013,
            Self::SetPacketLossPerc => 4014,
            Self::GetPacketLossPerc => 4015,
            Self::SetDtx => 4016,
            Self::GetDtx => 4017,
            Self::ResetState => 4028,
            Self::GetSampleRate => 4029,
            Self::GetLastPacketDuration => 4039,
            Self::GetInDtx => 4049,
        }
    }

    /// Returns the libopus macro name without the `OPUS_` prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetBitrate => "SET_BITRATE",
            Self::GetBitrate => "GET_BITRATE",
            Self::SetMaxBandwidth => "SET_MAX_BANDWIDTH",
            Self::GetMaxBandwidth => "GET_MAX_BANDWIDTH",
            Self::SetComplexity => "SET_COMPLEXITY",
            Self::GetComplexity => "GET_COMPLEXITY",
            Self::SetInbandFec => "SET_INBAND_FEC",
            Self::GetInbandFec => "GET_INBAND_FEC",
            Self::SetPacketLossPerc => "SET_PACKET_LOSS_PERC",
            Self::GetPacketLossPerc => "GET_PACKET_LOSS_PERC",
            Self::SetDtx => "SET_DTX",
            Self::GetDtx => "GET_DTX",
            Self::ResetState => "RESET_STATE",
            Self::GetSampleRate => "GET_SAMPLE_RATE",
            Self::GetLastPacketDuration => "GET_LAST_PACKET_DURATION",
            Self::GetInDtx => "GET_IN_DTX",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::SetBitrate
            | Self::SetMaxBandwidth
            | Self::SetComplexity
            | Self::SetInbandFec
            | Self::SetPacketLossPerc
            | Self::SetDtx => Direction::Set,
            Self::ResetState => Direction::Action,
            _ => Direction::Get,
        }
    }

    /// Number of `i32` arguments the request takes. Getters take one
    /// output slot; reset takes none.
    pub fn arity(&self) -> usize {
        match self.direction() {
            Direction::Action => 0,
            Direction::Get | Direction::Set => 1,
        }
    }

    /// The role that accepts this request, or `None` if both do.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::ResetState | Self::GetSampleRate => None,
            Self::GetLastPacketDuration => Some(Role::Decoder),
            _ => Some(Role::Encoder),
        }
    }

    /// Whether a session of `role` accepts this request.
    pub fn accepts(&self, role: Role) -> bool {
        self.role().is_none_or(|r| r == role)
    }
}

impl TryFrom<i32> for Request {
    type Error = CodecError;

    fn try_from(code: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.code() == code)
            .ok_or(CodecError::UnknownRequest(code))
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OPUS_{}", self.name())
    }
}

/// A request together with its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ctl {
    SetBitrate(i32),
    GetBitrate,
    SetMaxBandwidth(i32),
    GetMaxBandwidth,
    SetComplexity(i32),
    GetComplexity,
    SetInbandFec(i32),
    GetInbandFec,
    SetPacketLossPerc(i32),
    GetPacketLossPerc,
    SetDtx(i32),
    GetDtx,
    ResetState,
    GetSampleRate,
    GetLastPacketDuration,
    GetInDtx,
}

impl Ctl {
    pub fn request(&self) -> Request {
        match self {
            Self::SetBitrate(_) => Request::SetBitrate,
            Self::GetBitrate => Request::GetBitrate,
            Self::SetMaxBandwidth(_) => Request::SetMaxBandwidth,
            Self::GetMaxBandwidth => Request::GetMaxBandwidth,
            Self::SetComplexity(_) => Request::SetComplexity,
            Self::GetComplexity => Request::GetComplexity,
            Self::SetInbandFec(_) => Request::SetInbandFec,
            Self::GetInbandFec => Request::GetInbandFec,
            Self::SetPacketLossPerc(_) => Request::SetPacketLossPerc,
            Self::GetPacketLossPerc => Request::GetPacketLossPerc,
            Self::SetDtx(_) => Request::SetDtx,
            Self::GetDtx => Request::GetDtx,
            Self::ResetState => Request::ResetState,
            Self::GetSampleRate => Request::GetSampleRate,
            Self::GetLastPacketDuration => Request::GetLastPacketDuration,
            Self::GetInDtx => Request::GetInDtx,
        }
    }

    /// Builds a ctl from a request and its argument. The argument is
    /// ignored for getters and reset.
    pub fn new(request: Request, arg: i32) -> Self {
        match request {
            Request::SetBitrate => Self::SetBitrate(arg),
            Request::GetBitrate => Self::GetBitrate,
            Request::SetMaxBandwidth => Self::SetMaxBandwidth(arg),
            Request::GetMaxBandwidth => Self::GetMaxBandwidth,
            Request::SetComplexity => Self::SetComplexity(arg),
            Request::GetComplexity => Self::GetComplexity,
            Request::SetInbandFec => Self::SetInbandFec(arg),
            Request::GetInbandFec => Self::GetInbandFec,
            Request::SetPacketLossPerc => Self::SetPacketLossPerc(arg),
            Request::GetPacketLossPerc => Self::GetPacketLossPerc,
            Request::SetDtx => Self::SetDtx(arg),
            Request::GetDtx => Self::GetDtx,
            Request::ResetState => Self::ResetState,
            Request::GetSampleRate => Self::GetSampleRate,
            Request::GetLastPacketDuration => Self::GetLastPacketDuration,
            Request::GetInDtx => Self::GetInDtx,
        }
    }

    /// Builds a ctl from a raw request code.
    pub fn from_raw(code: i32, arg: i32) -> Result<Self> {
        Ok(Self::new(Request::try_from(code)?, arg))
    }

    /// The argument carried by a setter.
    pub fn arg(&self) -> Option<i32> {
        match *self {
            Self::SetBitrate(v)
            | Self::SetMaxBandwidth(v)
            | Self::SetComplexity(v)
            | Self::SetInbandFec(v)
            | Self::SetPacketLossPerc(v)
            | Self::SetDtx(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Ctl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arg() {
            Some(v) => write!(f, "{}({})", self.request(), v),
            None => write!(f, "{}", self.request()),
        }
    }
}

/// Outcome of a dispatched ctl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// A setter or reset completed.
    Done,
    /// A getter's value in protocol units.
    Value(i32),
}

impl Reply {
    pub fn value(&self) -> Option<i32> {
        match self {
            Self::Done => None,
            Self::Value(v) => Some(*v),
        }
    }
}

fn flag(request: Request, value: i32) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::invalid_argument(format!(
            "{} takes 0 or 1, got {}",
            request, other
        ))),
    }
}

/// Sends `ctl` to `session`.
pub fn dispatch(session: &mut Session, ctl: Ctl) -> Result<Reply> {
    let request = ctl.request();
    // Lifecycle and role are checked before the argument is converted.
    if !session.is_active() {
        return Err(CodecError::InvalidState(session.state()));
    }
    if !request.accepts(session.role()) {
        return Err(CodecError::Unsupported {
            op: request.name(),
            role: session.role(),
        });
    }

    let reply = match ctl {
        Ctl::SetBitrate(v) => {
            session.set_bitrate(Bitrate::try_from(v)?)?;
            Reply::Done
        }
        Ctl::GetBitrate => Reply::Value(session.bitrate()?.into()),
        Ctl::SetMaxBandwidth(v) => {
            session.set_max_bandwidth(Bandwidth::try_from(v)?)?;
            Reply::Done
        }
        Ctl::GetMaxBandwidth => Reply::Value(session.max_bandwidth()?.into()),
        Ctl::SetComplexity(v) => {
            session.set_complexity(v)?;
            Reply::Done
        }
        Ctl::GetComplexity => Reply::Value(session.complexity()?),
        Ctl::SetInbandFec(v) => {
            session.set_inband_fec(flag(request, v)?)?;
            Reply::Done
        }
        Ctl::GetInbandFec => Reply::Value(session.inband_fec()? as i32),
        Ctl::SetPacketLossPerc(v) => {
            session.set_packet_loss_perc(v)?;
            Reply::Done
        }
        Ctl::GetPacketLossPerc => Reply::Value(session.packet_loss_perc()?),
        Ctl::SetDtx(v) => {
            session.set_dtx(flag(request, v)?)?;
            Reply::Done
        }
        Ctl::GetDtx => Reply::Value(session.dtx()? as i32),
        Ctl::ResetState => {
            session.reset_state()?;
            Reply::Done
        }
        Ctl::GetSampleRate => Reply::Value(session.sample_rate()? as i32),
        Ctl::GetLastPacketDuration => {
            Reply::Value(session.last_packet_duration()?.unwrap_or(0) as i32)
        }
        Ctl::GetInDtx => Reply::Value(session.in_dtx()? as i32),
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AUTO;
    use crate::session::{Lifecycle, SessionConfig};

    fn encoder() -> Session {
        Session::encoder(SessionConfig::default()).unwrap()
    }

    #[test]
    fn test_request_codes() {
        assert_eq!(Request::SetBitrate.code(), 4002);
        assert_eq!(Request::GetInDtx.code(), 4049);
        assert_eq!(Request::GetLastPacketDuration.code(), 4039);
        for r in Request::ALL {
            assert_eq!(Request::try_from(r.code()).unwrap(), r);
        }
        assert_eq!(
            Request::try_from(4242),
            Err(CodecError::UnknownRequest(4242))
        );
    }

    #[test]
    fn test_request_shape() {
        assert_eq!(Request::SetDtx.direction(), Direction::Set);
        assert_eq!(Request::GetDtx.direction(), Direction::Get);
        assert_eq!(Request::ResetState.direction(), Direction::Action);
        assert_eq!(Request::ResetState.arity(), 0);
        assert_eq!(Request::GetSampleRate.arity(), 1);
        assert!(Request::GetSampleRate.accepts(Role::Decoder));
        assert!(!Request::GetLastPacketDuration.accepts(Role::Encoder));
        assert!(!Request::SetBitrate.accepts(Role::Decoder));
        assert_eq!(Request::SetDtx.to_string(), "OPUS_SET_DTX");
    }

    #[test]
    fn test_ctl_from_raw() {
        assert_eq!(Ctl::from_raw(4010, 5).unwrap(), Ctl::SetComplexity(5));
        assert_eq!(Ctl::from_raw(4011, 99).unwrap(), Ctl::GetComplexity);
        assert!(Ctl::from_raw(1, 0).is_err());
        assert_eq!(Ctl::SetBitrate(64000).to_string(), "OPUS_SET_BITRATE(64000)");
        for r in Request::ALL {
            assert_eq!(Ctl::new(r, 1).request(), r);
        }
    }

    #[test]
    fn test_dispatch_round_trip() {
        let mut enc = encoder();
        for v in 0..=10 {
            assert_eq!(dispatch(&mut enc, Ctl::SetComplexity(v)).unwrap(), Reply::Done);
            assert_eq!(dispatch(&mut enc, Ctl::GetComplexity).unwrap(), Reply::Value(v));
        }
        assert!(dispatch(&mut enc, Ctl::SetComplexity(11)).is_err());
        assert!(dispatch(&mut enc, Ctl::SetComplexity(-1)).is_err());
        assert_eq!(dispatch(&mut enc, Ctl::GetComplexity).unwrap(), Reply::Value(10));
    }

    #[test]
    fn test_dispatch_bitrate_scenario() {
        let mut enc = encoder();
        dispatch(&mut enc, Ctl::SetBitrate(64000)).unwrap();
        assert_eq!(dispatch(&mut enc, Ctl::GetBitrate).unwrap(), Reply::Value(64000));
        dispatch(&mut enc, Ctl::ResetState).unwrap();
        assert_eq!(dispatch(&mut enc, Ctl::GetBitrate).unwrap(), Reply::Value(AUTO));
        assert_eq!(dispatch(&mut enc, Ctl::GetSampleRate).unwrap(), Reply::Value(48000));
    }

    #[test]
    fn test_dispatch_flags() {
        let mut enc = encoder();
        dispatch(&mut enc, Ctl::SetDtx(1)).unwrap();
        assert_eq!(dispatch(&mut enc, Ctl::GetDtx).unwrap(), Reply::Value(1));
        assert_eq!(dispatch(&mut enc, Ctl::GetInDtx).unwrap(), Reply::Value(0));
        assert!(matches!(
            dispatch(&mut enc, Ctl::SetInbandFec(2)),
            Err(CodecError::InvalidArgument(_))
        ));
        assert_eq!(dispatch(&mut enc, Ctl::GetInbandFec).unwrap(), Reply::Value(0));
    }

    #[test]
    fn test_dispatch_bandwidth() {
        let mut enc = encoder();
        assert_eq!(dispatch(&mut enc, Ctl::GetMaxBandwidth).unwrap(), Reply::Value(1105));
        dispatch(&mut enc, Ctl::SetMaxBandwidth(1103)).unwrap();
        assert_eq!(dispatch(&mut enc, Ctl::GetMaxBandwidth).unwrap(), Reply::Value(1103));
        assert!(dispatch(&mut enc, Ctl::SetMaxBandwidth(1106)).is_err());
        assert_eq!(dispatch(&mut enc, Ctl::GetMaxBandwidth).unwrap(), Reply::Value(1103));
    }

    #[test]
    fn test_dispatch_decoder() {
        let mut dec = Session::decoder(SessionConfig::default()).unwrap();
        assert_eq!(
            dispatch(&mut dec, Ctl::GetLastPacketDuration).unwrap(),
            Reply::Value(0)
        );
        dec.decode_vec(&[0xF8]).unwrap();
        assert_eq!(
            dispatch(&mut dec, Ctl::GetLastPacketDuration).unwrap(),
            Reply::Value(960)
        );
        assert!(matches!(
            dispatch(&mut dec, Ctl::GetDtx),
            Err(CodecError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_dispatch_after_close() {
        let mut enc = encoder();
        enc.close().unwrap();
        for r in Request::ALL.into_iter().filter(|r| r.accepts(Role::Encoder)) {
            assert_eq!(
                dispatch(&mut enc, Ctl::new(r, 0)),
                Err(CodecError::InvalidState(Lifecycle::Destroyed))
            );
        }
    }
}

//! Mode S message record
//!
//! Holds the framing fields the demodulator fills in before Comm-B decoding
//! and the decoded register fields the Comm-B arbiter writes back. The record
//! is owned by the caller for the duration of one reply; nothing in here is
//! shared or retained.

use std::fmt;

/// Number of bytes in the Comm-B MB field
pub const COMMB_MB_BYTES: usize = 7;

/// Classification outcome for a Comm-B reply.
///
/// Comm-B payloads carry no register identifier, so this is inferred by
/// scoring every candidate register layout against the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommBFormat {
    /// Framing refused the attempt (DR/UM non-zero or bits were corrected)
    #[default]
    NotDecoded,
    /// No register layout scored positively
    Unknown,
    /// Two or more register layouts tied at the top score
    Ambiguous,
    /// All-zero (or 40/50/60-prefixed all-zero) reply to an unsupported register
    EmptyResponse,
    /// BDS 1,0 datalink capability report
    DatalinkCaps,
    /// BDS 1,7 common usage GICB capability report
    GicbCaps,
    /// BDS 2,0 aircraft identification
    AircraftIdent,
    /// BDS 3,0 ACAS active resolution advisory
    AcasRa,
    /// BDS 4,0 selected vertical intention
    VerticalIntent,
    /// BDS 5,0 track and turn report
    TrackTurn,
    /// BDS 6,0 heading and speed report
    HeadingSpeed,
    /// BDS 4,4 meteorological routine air report
    Mrar,
    /// BDS 0,5 extended squitter airborne position read back over Comm-B
    AirbornePosition,
}

impl CommBFormat {
    pub fn describe(&self) -> &'static str {
        match self {
            CommBFormat::NotDecoded => "not decoded",
            CommBFormat::Unknown => "unknown",
            CommBFormat::Ambiguous => "ambiguous",
            CommBFormat::EmptyResponse => "empty response",
            CommBFormat::DatalinkCaps => "BDS 1,0 datalink capabilities",
            CommBFormat::GicbCaps => "BDS 1,7 GICB capabilities",
            CommBFormat::AircraftIdent => "BDS 2,0 aircraft identification",
            CommBFormat::AcasRa => "BDS 3,0 ACAS resolution advisory",
            CommBFormat::VerticalIntent => "BDS 4,0 selected vertical intention",
            CommBFormat::TrackTurn => "BDS 5,0 track and turn",
            CommBFormat::HeadingSpeed => "BDS 6,0 heading and speed",
            CommBFormat::Mrar => "BDS 4,4 meteorological routine report",
            CommBFormat::AirbornePosition => "BDS 0,5 airborne position",
        }
    }
}

/// Whether a reported heading is a ground track or a magnetic heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingType {
    GroundTrack,
    Magnetic,
}

/// Source of the selected altitude in a BDS 4,0 report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAltitudeSource {
    Unknown,
    Aircraft,
    Mcp,
    Fms,
    Invalid,
}

/// Active autopilot modes from a BDS 4,0 report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavModes {
    pub vnav: bool,
    pub alt_hold: bool,
    pub approach: bool,
}

/// Selected vertical intention fields (BDS 4,0)
#[derive(Debug, Clone, Default)]
pub struct NavState {
    /// MCP/FCU selected altitude in feet (multiples of 16)
    pub mcp_altitude: Option<u32>,
    /// FMS selected altitude in feet (multiples of 16)
    pub fms_altitude: Option<u32>,
    /// Barometric pressure setting in hPa
    pub qnh: Option<f32>,
    pub modes: Option<NavModes>,
    pub altitude_source: Option<NavAltitudeSource>,
}

/// Ground speed in knots, mirrored into the per-version slots the
/// surrounding tracker reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSpeed {
    pub v0: f32,
    pub v2: f32,
    pub selected: f32,
}

impl GroundSpeed {
    pub fn all(kt: f32) -> Self {
        Self {
            v0: kt,
            v2: kt,
            selected: kt,
        }
    }
}

/// Navigation source of a meteorological routine air report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MrarSource {
    Ins,
    Gnss,
    DmeDme,
    VorDme,
}

impl MrarSource {
    /// Map the 4-bit source field. Zero is the invalid marker and codes
    /// from 5 up are reserved, both of which disqualify the report.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(MrarSource::Ins),
            2 => Some(MrarSource::Gnss),
            3 => Some(MrarSource::DmeDme),
            4 => Some(MrarSource::VorDme),
            _ => None,
        }
    }
}

impl fmt::Display for MrarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MrarSource::Ins => "INS",
            MrarSource::Gnss => "GNSS",
            MrarSource::DmeDme => "DME/DME",
            MrarSource::VorDme => "VOR/DME",
        };
        write!(f, "{}", s)
    }
}

/// Turbulence hazard code from a BDS 4,4 report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turbulence {
    Nil,
    Light,
    Moderate,
    Severe,
}

impl Turbulence {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 3 {
            0 => Turbulence::Nil,
            1 => Turbulence::Light,
            2 => Turbulence::Moderate,
            _ => Turbulence::Severe,
        }
    }
}

/// Wind vector from a BDS 4,4 report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wind {
    /// Speed in knots
    pub speed: f32,
    /// Direction in degrees, 0..359.3
    pub direction: f32,
}

/// A Comm-B reply with its framing fields and decoded register content.
///
/// The demodulator fills in everything down to `mb` before handing the record
/// to `commb::decode_commb`; the decoded fields below start out `None` and
/// are only written when a unique best-scoring register decoder runs in
/// store mode.
#[derive(Debug, Clone)]
pub struct ModesMessage {
    /// Raw 112-bit frame as received (for display)
    pub raw: [u8; 14],
    /// Downlink format, 20 or 21
    pub msg_type: u8,
    /// Flight status field
    pub fs: u8,
    /// Downlink request field
    pub dr: u8,
    /// Utility message field
    pub um: u8,
    /// Raw 13-bit altitude code from the DF20 frame (zero for DF21)
    pub ac: u16,
    /// Squawk identity from the DF21 frame (zero for DF20)
    pub identity: u16,
    /// ICAO address recovered from the Address/Parity field
    pub icao: u32,
    /// Bits repaired by error correction upstream; non-zero disqualifies
    /// the payload from Comm-B classification
    pub corrected_bits: u32,
    /// The 56-bit Comm-B message field
    pub mb: [u8; COMMB_MB_BYTES],

    pub commb_format: CommBFormat,

    /// 8-character callsign, `[A-Z0-9 ]` only (BDS 2,0)
    pub callsign: Option<String>,
    pub nav: NavState,
    /// Roll angle in degrees, right wing down positive (BDS 5,0)
    pub roll: Option<f32>,
    /// Heading or ground track in degrees; see `heading_type`
    pub heading: Option<f32>,
    pub heading_type: Option<HeadingType>,
    pub gs: Option<GroundSpeed>,
    /// Track angle rate in degrees per second (BDS 5,0)
    pub track_rate: Option<f32>,
    /// True airspeed in knots (BDS 5,0)
    pub tas: Option<u32>,
    /// Indicated airspeed in knots (BDS 6,0)
    pub ias: Option<u32>,
    pub mach: Option<f32>,
    /// Barometric vertical rate in ft/min (BDS 6,0)
    pub baro_rate: Option<i32>,
    /// Inertial vertical rate in ft/min, carried as geometric (BDS 6,0)
    pub geom_rate: Option<i32>,

    pub mrar_source: Option<MrarSource>,
    pub wind: Option<Wind>,
    /// Static air temperature in degrees C (BDS 4,4)
    pub temperature: Option<f32>,
    /// Average static pressure in hPa (BDS 4,4)
    pub pressure: Option<f32>,
    pub turbulence: Option<Turbulence>,
    /// Relative humidity in percent (BDS 4,4)
    pub humidity: Option<f32>,
}

impl Default for ModesMessage {
    fn default() -> Self {
        Self {
            raw: [0; 14],
            msg_type: 0,
            fs: 0,
            dr: 0,
            um: 0,
            ac: 0,
            identity: 0,
            icao: 0,
            corrected_bits: 0,
            mb: [0; COMMB_MB_BYTES],
            commb_format: CommBFormat::default(),
            callsign: None,
            nav: NavState::default(),
            roll: None,
            heading: None,
            heading_type: None,
            gs: None,
            track_rate: None,
            tas: None,
            ias: None,
            mach: None,
            baro_rate: None,
            geom_rate: None,
            mrar_source: None,
            wind: None,
            temperature: None,
            pressure: None,
            turbulence: None,
            humidity: None,
        }
    }
}

impl ModesMessage {
    /// Format the frame as an AVR raw string
    pub fn to_raw_string(&self) -> String {
        let mut s = String::with_capacity(self.raw.len() * 2 + 2);
        s.push('*');
        for b in &self.raw {
            s.push_str(&format!("{:02X}", b));
        }
        s.push(';');
        s
    }

    /// Decoded barometric altitude in feet from the 13-bit AC code.
    ///
    /// Only the 25 ft (Q bit) encoding is handled; the metric (M bit) and
    /// Gillham encodings return `None`.
    pub fn altitude(&self) -> Option<i32> {
        decode_ac13(self.ac)
    }
}

/// Decode a 13-bit AC altitude code to feet.
///
/// Bit layout per Annex 10 §3.1.2.6.5.4: the M bit sits at 0x0040 and the
/// Q bit at 0x0010. With M=0 and Q=1 the remaining 11 bits encode
/// `N * 25 - 1000` feet.
pub fn decode_ac13(ac: u16) -> Option<i32> {
    if ac == 0 || ac & 0x0040 != 0 {
        return None;
    }
    if ac & 0x0010 != 0 {
        let n = (((ac & 0x1F80) >> 2) | ((ac & 0x0020) >> 1) | (ac & 0x000F)) as i32;
        return Some(n * 25 - 1000);
    }
    // Gillham-coded altitude, not handled
    None
}

impl fmt::Display for ModesMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.to_raw_string())?;

        let name = if self.msg_type == 20 {
            "Comm-B, Altitude Reply"
        } else {
            "Comm-B, Identity Reply"
        };
        writeln!(f, "DF {}: {}", self.msg_type, name)?;
        writeln!(f, "  ICAO Address : {:06x}", self.icao)?;
        if self.msg_type == 20 {
            if let Some(alt) = self.altitude() {
                writeln!(f, "  Altitude     : {} ft", alt)?;
            }
        } else if self.identity != 0 {
            writeln!(f, "  Squawk       : {:04}", self.identity)?;
        }
        writeln!(f, "  Comm-B       : {}", self.commb_format.describe())?;

        match self.commb_format {
            CommBFormat::AircraftIdent => {
                if let Some(ref callsign) = self.callsign {
                    writeln!(f, "    Callsign       : {}", callsign)?;
                }
            }
            CommBFormat::VerticalIntent => {
                if let Some(alt) = self.nav.mcp_altitude {
                    writeln!(f, "    MCP altitude   : {} ft", alt)?;
                }
                if let Some(alt) = self.nav.fms_altitude {
                    writeln!(f, "    FMS altitude   : {} ft", alt)?;
                }
                if let Some(qnh) = self.nav.qnh {
                    writeln!(f, "    QNH            : {:.1} hPa", qnh)?;
                }
                if let Some(modes) = self.nav.modes {
                    writeln!(
                        f,
                        "    Modes          : vnav={} alt_hold={} approach={}",
                        modes.vnav, modes.alt_hold, modes.approach
                    )?;
                }
                if let Some(source) = self.nav.altitude_source {
                    writeln!(f, "    Altitude source: {:?}", source)?;
                }
            }
            CommBFormat::TrackTurn => {
                if let Some(roll) = self.roll {
                    writeln!(f, "    Roll           : {:.1} deg", roll)?;
                }
                if let Some(track) = self.heading {
                    writeln!(f, "    Ground track   : {:.1} deg", track)?;
                }
                if let Some(gs) = self.gs {
                    writeln!(f, "    Ground speed   : {:.0} kt", gs.selected)?;
                }
                if let Some(rate) = self.track_rate {
                    writeln!(f, "    Track rate     : {:.2} deg/s", rate)?;
                }
                if let Some(tas) = self.tas {
                    writeln!(f, "    TAS            : {} kt", tas)?;
                }
            }
            CommBFormat::HeadingSpeed => {
                if let Some(heading) = self.heading {
                    writeln!(f, "    Mag heading    : {:.1} deg", heading)?;
                }
                if let Some(ias) = self.ias {
                    writeln!(f, "    IAS            : {} kt", ias)?;
                }
                if let Some(mach) = self.mach {
                    writeln!(f, "    Mach           : {:.3}", mach)?;
                }
                if let Some(rate) = self.baro_rate {
                    writeln!(f, "    Baro rate      : {} ft/min", rate)?;
                }
                if let Some(rate) = self.geom_rate {
                    writeln!(f, "    Inertial rate  : {} ft/min", rate)?;
                }
            }
            CommBFormat::Mrar => {
                if let Some(source) = self.mrar_source {
                    writeln!(f, "    Source         : {}", source)?;
                }
                if let Some(wind) = self.wind {
                    writeln!(
                        f,
                        "    Wind           : {:.0} kt at {:.1} deg",
                        wind.speed, wind.direction
                    )?;
                }
                if let Some(t) = self.temperature {
                    writeln!(f, "    Temperature    : {:.2} C", t)?;
                }
                if let Some(p) = self.pressure {
                    writeln!(f, "    Pressure       : {:.0} hPa", p)?;
                }
                if let Some(turb) = self.turbulence {
                    writeln!(f, "    Turbulence     : {:?}", turb)?;
                }
                if let Some(h) = self.humidity {
                    writeln!(f, "    Humidity       : {:.1} %", h)?;
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_is_blank() {
        let mm = ModesMessage::default();
        assert_eq!(mm.commb_format, CommBFormat::NotDecoded);
        assert!(mm.callsign.is_none());
        assert!(mm.nav.mcp_altitude.is_none());
        assert!(mm.roll.is_none());
        assert!(mm.wind.is_none());
    }

    #[test]
    fn test_decode_ac13_q_bit() {
        // N=197 with Q set: 197 * 25 - 1000 = 3925 ft
        assert_eq!(decode_ac13(0x0315), Some(3925));
        // Zero code carries no data
        assert_eq!(decode_ac13(0), None);
        // M bit set (metric) is not decoded
        assert_eq!(decode_ac13(0x0040), None);
        // Q=0 is Gillham-coded, not handled
        assert_eq!(decode_ac13(0x1000), None);
    }

    #[test]
    fn test_mrar_source_boundaries() {
        assert_eq!(MrarSource::from_raw(0), None);
        assert_eq!(MrarSource::from_raw(1), Some(MrarSource::Ins));
        assert_eq!(MrarSource::from_raw(4), Some(MrarSource::VorDme));
        assert_eq!(MrarSource::from_raw(5), None);
        assert_eq!(MrarSource::from_raw(15), None);
    }

    #[test]
    fn test_to_raw_string() {
        let mut mm = ModesMessage::default();
        mm.raw = [
            0xA0, 0x00, 0x03, 0x15, 0x20, 0x04, 0x20, 0xF1, 0xCB, 0x38, 0x20, 0x12, 0x34, 0x56,
        ];
        assert_eq!(mm.to_raw_string(), "*A0000315200420F1CB3820123456;");
    }
}

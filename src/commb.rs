//! Comm-B register classification and decoding
//!
//! A Comm-B reply does not say which BDS register it carries, so every
//! candidate register decoder is run over the 56-bit MB field in scoring
//! mode. Each decoder returns 0 when the payload cannot be its register and
//! a positive plausibility score otherwise. The unique best scorer is then
//! re-run in store mode to fill in the record; a tie is reported as
//! ambiguous rather than guessed at.

use std::f64::consts::PI;

use crate::bits::{bit, bits};
use crate::message::{
    CommBFormat, GroundSpeed, HeadingType, ModesMessage, MrarSource, NavAltitudeSource, NavModes,
    Turbulence, Wind,
};

/// Character set for the 6-bit IA-5 subset used by BDS 2,0 callsigns.
/// Index 0 is the padding sentinel; anything outside `[A-Z0-9 @]` marks the
/// payload as not a valid identification.
const AIS_CHARSET: &[u8; 64] =
    b"@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_ !\"#$%&'()*+,-./0123456789:;<=>?";

type CommBDecoderFn = fn(&mut ModesMessage, bool) -> i32;

static COMMB_DECODERS: [CommBDecoderFn; 10] = [
    decode_empty_response,
    decode_bds10,
    decode_bds20,
    decode_bds30,
    decode_bds17,
    decode_bds40,
    decode_bds50,
    decode_bds60,
    decode_bds44,
    decode_bds05,
];

/// Classify the MB field of a DF20/DF21 reply and extract its content.
///
/// Writes `commb_format` exactly once. Decoded fields are only written when
/// a unique best-scoring register decoder runs in store mode.
pub fn decode_commb(mm: &mut ModesMessage) {
    // Replies with DR or UM set are probably noise (the multisite broadcast
    // machinery is essentially unused), and repaired bits make the payload
    // too untrustworthy to classify on structure alone.
    if mm.dr != 0 || mm.um != 0 || mm.corrected_bits > 0 {
        mm.commb_format = CommBFormat::NotDecoded;
        return;
    }

    let mut best_score = 0;
    let mut best_decoder: Option<CommBDecoderFn> = None;
    let mut ambiguous = false;

    for decoder in COMMB_DECODERS {
        let score = decoder(mm, false);
        if score > best_score {
            best_score = score;
            best_decoder = Some(decoder);
            ambiguous = false;
        } else if score == best_score {
            ambiguous = true;
        }
    }

    match best_decoder {
        None => mm.commb_format = CommBFormat::Unknown,
        Some(_) if ambiguous => mm.commb_format = CommBFormat::Ambiguous,
        Some(decoder) => {
            decoder(mm, true);
        }
    }
}

/// All-zero replies are what most transponders send for a register they do
/// not support. Replies of 40/50/60 followed by zeros turn up in grouped
/// bursts from the same airframe, presumably unsupported BDS 4,0 / 5,0 /
/// 6,0 interrogations, and are treated the same way.
fn decode_empty_response(mm: &mut ModesMessage, store: bool) -> i32 {
    match mm.mb[0] {
        0x00 | 0x40 | 0x50 | 0x60 => {}
        _ => return 0,
    }

    if mm.mb[1..].iter().any(|&b| b != 0) {
        return 0;
    }

    if store {
        mm.commb_format = CommBFormat::EmptyResponse;
    }

    56
}

// BDS 1,0 datalink capability report
fn decode_bds10(mm: &mut ModesMessage, store: bool) -> i32 {
    let msg = &mm.mb;

    // BDS identifier
    if msg[0] != 0x10 {
        return 0;
    }

    // Reserved bits
    if bits(msg, 10, 14) != 0 {
        return 0;
    }

    if store {
        mm.commb_format = CommBFormat::DatalinkCaps;
    }

    56
}

// BDS 1,7 common usage GICB capability report.
//
// There is no identifying byte; the register is recognised purely by which
// capability bits are plausible together.
fn decode_bds17(mm: &mut ModesMessage, store: bool) -> i32 {
    let msg = &mm.mb;

    // Reserved bits
    if bits(msg, 25, 56) != 0 {
        return 0;
    }

    let mut score = 0;

    if bit(msg, 7) == 1 {
        score += 1; // BDS 2,0 aircraft identification
    } else {
        // nearly every airframe carries BDS 2,0
        score -= 2;
    }

    // capabilities that are rare in practice
    if bit(msg, 10) == 1 {
        score -= 2; // BDS 4,1 next waypoint identifier
    }
    if bit(msg, 11) == 1 {
        score -= 2; // BDS 4,2 next waypoint position
    }
    if bit(msg, 12) == 1 {
        score -= 2; // BDS 4,3 next waypoint information
    }
    if bit(msg, 13) == 1 {
        score -= 1; // BDS 4,4 meteorological routine report
    }
    if bit(msg, 14) == 1 {
        score -= 1; // BDS 4,5 meteorological hazard report
    }
    if bit(msg, 20) == 1 {
        score -= 2; // BDS 5,4 waypoint 1
    }
    if bit(msg, 21) == 1 {
        score -= 2; // BDS 5,5 waypoint 2
    }
    if bit(msg, 22) == 1 {
        score -= 2; // BDS 5,6 waypoint 3
    }

    // Bits 1..6 cover the extended squitter registers and tend to appear
    // in a few fixed clusters.
    let es_bits = [
        bit(msg, 1),
        bit(msg, 2),
        bit(msg, 3),
        bit(msg, 4),
        bit(msg, 5),
        bit(msg, 6),
    ];
    if es_bits[..5] == [1, 1, 1, 1, 1] {
        // fully ES capable
        score += 5;
        if es_bits[5] == 1 {
            // ES event-driven information
            score += 1;
        }
    } else if es_bits == [0, 0, 0, 0, 0, 0] {
        // not ES capable
        score += 1;
    } else if es_bits[..5] == [0, 0, 1, 1, 1] {
        // ES without position data
        score += 3;
    } else {
        score -= 12;
    }

    // Track/turn (bit 16) and heading/speed (bit 24) reports come as a
    // pair, usually with vertical intention (bit 9) alongside.
    if bit(msg, 16) == 1 && bit(msg, 24) == 1 {
        score += 2;
        if bit(msg, 9) == 1 {
            score += 1;
        }
    } else if bit(msg, 9) == 0 && bit(msg, 16) == 0 && bit(msg, 24) == 0 {
        score += 1;
    } else {
        score -= 6;
    }

    if store {
        mm.commb_format = CommBFormat::GicbCaps;
    }

    score
}

// BDS 2,0 aircraft identification
fn decode_bds20(mm: &mut ModesMessage, store: bool) -> i32 {
    let msg = &mm.mb;

    // BDS identifier
    if msg[0] != 0x20 {
        return 0;
    }

    let mut callsign = [0u8; 8];
    let mut score = 8;
    let mut valid = true;

    for (i, out) in callsign.iter_mut().enumerate() {
        let lo = 9 + 6 * i as u32;
        let ch = AIS_CHARSET[bits(msg, lo, lo + 5) as usize];
        if ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == b' ' {
            score += 6;
        } else if ch == b'@' {
            // Padding. All-pad callsigns (an idle BDS 2,0) are still
            // accepted as the register, just without a usable callsign.
            valid = false;
        } else {
            return 0;
        }
        *out = ch;
    }

    if store {
        mm.commb_format = CommBFormat::AircraftIdent;
        if valid {
            mm.callsign = Some(String::from_utf8_lossy(&callsign).into_owned());
        }
    }

    score
}

// BDS 3,0 ACAS active resolution advisory
fn decode_bds30(mm: &mut ModesMessage, store: bool) -> i32 {
    // The identifying byte is all there is to check; the advisory fields
    // have no structure we can validate.
    if mm.mb[0] != 0x30 {
        return 0;
    }

    if store {
        mm.commb_format = CommBFormat::AcasRa;
    }

    56
}

// BDS 4,0 selected vertical intention
fn decode_bds40(mm: &mut ModesMessage, store: bool) -> i32 {
    let msg = &mm.mb;

    let mcp_valid = bit(msg, 1) == 1;
    let mcp_raw = bits(msg, 2, 13);
    let fms_valid = bit(msg, 14) == 1;
    let fms_raw = bits(msg, 15, 26);
    let baro_valid = bit(msg, 27) == 1;
    let baro_raw = bits(msg, 28, 39);
    let reserved_1 = bits(msg, 40, 47);
    let mode_valid = bit(msg, 48) == 1;
    let mode_raw = bits(msg, 49, 51);
    let reserved_2 = bits(msg, 52, 53);
    let source_valid = bit(msg, 54) == 1;
    let source_raw = bits(msg, 55, 56);

    if !mcp_valid && !fms_valid && !baro_valid && !mode_valid && !source_valid {
        return 0;
    }

    let mut score = 0;

    let mut mcp_alt = 0;
    if mcp_valid && mcp_raw != 0 {
        mcp_alt = mcp_raw * 16;
        if (1000..=50000).contains(&mcp_alt) {
            score += 13;
        } else {
            // unlikely altitude
            return 0;
        }
    } else if !mcp_valid && mcp_raw == 0 {
        score += 1;
    } else {
        return 0;
    }

    let mut fms_alt = 0;
    if fms_valid && fms_raw != 0 {
        fms_alt = fms_raw * 16;
        if (1000..=50000).contains(&fms_alt) {
            score += 13;
        } else {
            // unlikely altitude
            return 0;
        }
    } else if !fms_valid && fms_raw == 0 {
        score += 1;
    } else {
        return 0;
    }

    let mut baro_setting = 0.0;
    if baro_valid && baro_raw != 0 {
        baro_setting = 800.0 + baro_raw as f32 * 0.1;
        if (900.0..=1100.0).contains(&baro_setting) {
            score += 13;
        } else {
            // unlikely pressure setting
            return 0;
        }
    } else if !baro_valid && baro_raw == 0 {
        score += 1;
    } else {
        return 0;
    }

    if reserved_1 != 0 {
        return 0;
    }

    if mode_valid {
        score += 4;
    } else if mode_raw == 0 {
        score += 1;
    } else {
        return 0;
    }

    if reserved_2 != 0 {
        return 0;
    }

    if source_valid {
        score += 3;
    } else if source_raw == 0 {
        score += 1;
    } else {
        return 0;
    }

    // small penalty for inconsistent data
    if mcp_valid && fms_valid && mcp_alt != fms_alt {
        score -= 4;
    }

    // selected altitudes sit on 500 ft steps almost always
    if mcp_valid {
        let remainder = mcp_alt % 500;
        if !(remainder < 16 || remainder > 484) {
            score -= 4;
        }
    }
    if fms_valid {
        let remainder = fms_alt % 500;
        if !(remainder < 16 || remainder > 484) {
            score -= 4;
        }
    }

    if store {
        mm.commb_format = CommBFormat::VerticalIntent;

        if mcp_valid {
            mm.nav.mcp_altitude = Some(mcp_alt);
        }
        if fms_valid {
            mm.nav.fms_altitude = Some(fms_alt);
        }
        if baro_valid {
            mm.nav.qnh = Some(baro_setting);
        }
        if mode_valid {
            mm.nav.modes = Some(NavModes {
                vnav: mode_raw & 4 != 0,
                alt_hold: mode_raw & 2 != 0,
                approach: mode_raw & 1 != 0,
            });
        }
        mm.nav.altitude_source = Some(if source_valid {
            match source_raw {
                0 => NavAltitudeSource::Unknown,
                1 => NavAltitudeSource::Aircraft,
                2 => NavAltitudeSource::Mcp,
                3 => NavAltitudeSource::Fms,
                _ => NavAltitudeSource::Invalid,
            }
        } else {
            NavAltitudeSource::Invalid
        });
    }

    score
}

// BDS 5,0 track and turn report
fn decode_bds50(mm: &mut ModesMessage, store: bool) -> i32 {
    let msg = &mm.mb;

    let roll_valid = bit(msg, 1) == 1;
    let roll_sign = bit(msg, 2) == 1;
    let roll_raw = bits(msg, 3, 11);

    let track_valid = bit(msg, 12) == 1;
    let track_sign = bit(msg, 13) == 1;
    let track_raw = bits(msg, 14, 23);

    let gs_valid = bit(msg, 24) == 1;
    let gs_raw = bits(msg, 25, 34);

    let track_rate_valid = bit(msg, 35) == 1;
    let track_rate_sign = bit(msg, 36) == 1;
    let track_rate_raw = bits(msg, 37, 45);

    let tas_valid = bit(msg, 46) == 1;
    let tas_raw = bits(msg, 47, 56);

    // real reports always carry these four
    if !roll_valid || !track_valid || !gs_valid || !tas_valid {
        return 0;
    }

    let mut score = 0;

    let mut roll = roll_raw as f32 * 45.0 / 256.0;
    if roll_sign {
        roll -= 90.0;
    }
    if roll >= -40.0 && roll < 40.0 {
        score += 11;
    } else {
        return 0;
    }

    let mut track = track_raw as f32 * 90.0 / 512.0;
    if track_sign {
        track += 180.0;
    }
    score += 12;

    if gs_raw == 0 {
        return 0;
    }
    let gs = gs_raw * 2;
    if (50..=700).contains(&gs) {
        score += 11;
    } else {
        return 0;
    }

    let mut track_rate = 0.0;
    if track_rate_valid {
        track_rate = track_rate_raw as f32 * 8.0 / 256.0;
        if track_rate_sign {
            track_rate -= 16.0;
        }
        if (-10.0..=10.0).contains(&track_rate) {
            score += 11;
        } else {
            return 0;
        }
    } else if track_rate_raw == 0 && !track_rate_sign {
        score += 1;
    } else {
        return 0;
    }

    if tas_raw == 0 {
        return 0;
    }
    let tas = tas_raw * 2;
    if (50..=700).contains(&tas) {
        score += 11;
    } else {
        return 0;
    }

    // small penalty for inconsistent data
    if (gs as i32 - tas as i32).abs() > 150 {
        score -= 6;
    }

    // The roll angle implies a turn rate at a given TAS; compare it to the
    // reported track angle rate.
    if track_rate_valid && tas > 0 {
        let turn_rate =
            68625.0 * (roll as f64 * PI / 180.0).tan() / (tas as f64 * 20.0 * PI);
        if (turn_rate - track_rate as f64).abs() > 2.0 {
            score -= 6;
        }
    }

    if store {
        mm.commb_format = CommBFormat::TrackTurn;
        mm.roll = Some(roll);
        mm.heading = Some(track);
        mm.heading_type = Some(HeadingType::GroundTrack);
        mm.gs = Some(GroundSpeed::all(gs as f32));
        if track_rate_valid {
            mm.track_rate = Some(track_rate);
        }
        mm.tas = Some(tas);
    }

    score
}

// BDS 6,0 heading and speed report
fn decode_bds60(mm: &mut ModesMessage, store: bool) -> i32 {
    let msg = &mm.mb;

    let heading_valid = bit(msg, 1) == 1;
    let heading_sign = bit(msg, 2) == 1;
    let heading_raw = bits(msg, 3, 12);

    let ias_valid = bit(msg, 13) == 1;
    let ias_raw = bits(msg, 14, 23);

    let mach_valid = bit(msg, 24) == 1;
    let mach_raw = bits(msg, 25, 34);

    let baro_rate_valid = bit(msg, 35) == 1;
    let baro_rate_sign = bit(msg, 36) == 1;
    let baro_rate_raw = bits(msg, 37, 45);

    let inertial_rate_valid = bit(msg, 46) == 1;
    let inertial_rate_sign = bit(msg, 47) == 1;
    let inertial_rate_raw = bits(msg, 48, 56);

    if !heading_valid || !ias_valid || !mach_valid || (!baro_rate_valid && !inertial_rate_valid) {
        return 0;
    }

    let mut score = 0;

    let mut heading = heading_raw as f32 * 90.0 / 512.0;
    if heading_sign {
        heading += 180.0;
    }
    score += 12;

    if ias_raw == 0 {
        return 0;
    }
    let ias = ias_raw;
    if (50..=700).contains(&ias) {
        score += 11;
    } else {
        return 0;
    }

    if mach_raw == 0 {
        return 0;
    }
    let mach = mach_raw as f32 * 2.048 / 512.0;
    if (0.1..=0.9).contains(&mach) {
        score += 11;
    } else {
        return 0;
    }

    let mut baro_rate = 0;
    if baro_rate_valid {
        baro_rate = baro_rate_raw as i32 * 32;
        if baro_rate_sign {
            baro_rate -= 16384;
        }
        if (-6000..=6000).contains(&baro_rate) {
            score += 11;
        } else {
            return 0;
        }
    } else if baro_rate_raw == 0 {
        score += 1;
    } else {
        return 0;
    }

    let mut inertial_rate = 0;
    if inertial_rate_valid {
        inertial_rate = inertial_rate_raw as i32 * 32;
        if inertial_rate_sign {
            inertial_rate -= 16384;
        }
        if (-6000..=6000).contains(&inertial_rate) {
            score += 11;
        } else {
            return 0;
        }
    } else if inertial_rate_raw == 0 {
        score += 1;
    } else {
        return 0;
    }

    // small penalty for inconsistent data. IAS against Mach would need the
    // pressure altitude, so only the two vertical rates are compared.
    if baro_rate_valid && inertial_rate_valid && (baro_rate - inertial_rate).abs() > 2000 {
        score -= 12;
    }

    if store {
        mm.commb_format = CommBFormat::HeadingSpeed;
        mm.heading = Some(heading);
        mm.heading_type = Some(HeadingType::Magnetic);
        mm.ias = Some(ias);
        mm.mach = Some(mach);
        if baro_rate_valid {
            mm.baro_rate = Some(baro_rate);
        }
        if inertial_rate_valid {
            // INS-derived vertical data is carried as geometric rate, the
            // same as the rest of the pipeline treats inertial sources.
            mm.geom_rate = Some(inertial_rate);
        }
    }

    score
}

// BDS 4,4 meteorological routine air report.
//
// Doc 9871 claims a sign bit at 24 followed by a 10-bit temperature, but
// that is one bit too many for the stated scale. Observed traffic fits a
// status bit at 24, sign at 25 and a 9-bit value at 26..34, which is the
// layout used here.
fn decode_bds44(mm: &mut ModesMessage, store: bool) -> i32 {
    let msg = &mm.mb;

    let source_raw = bits(msg, 1, 4);

    let wind_valid = bit(msg, 5) == 1;
    let windspeed_raw = bits(msg, 6, 14);
    let winddir_raw = bits(msg, 15, 23);

    let sat_valid = bit(msg, 24) == 1;
    let sat_sign = bit(msg, 25) == 1;
    let sat_raw = bits(msg, 26, 34);

    let asp_valid = bit(msg, 35) == 1;
    let asp_raw = bits(msg, 36, 46);

    let turbulence_valid = bit(msg, 47) == 1;
    let turbulence_raw = bits(msg, 48, 49);

    let humidity_valid = bit(msg, 50) == 1;
    let humidity_raw = bits(msg, 51, 56);

    // invalid or reserved navigation source
    let source = match MrarSource::from_raw(source_raw) {
        Some(source) => source,
        None => return 0,
    };

    // every plausible report seen in the wild carries wind and temperature
    if !wind_valid || !sat_valid {
        return 0;
    }

    // fields flagged absent must have empty value bits
    if !asp_valid && asp_raw != 0 {
        return 0;
    }
    if !turbulence_valid && turbulence_raw != 0 {
        return 0;
    }
    if !humidity_valid && humidity_raw != 0 {
        return 0;
    }

    let mut score = 0;

    let wind_dir = winddir_raw as f32 * (180.0 / 256.0);
    let wind_speed = windspeed_raw as f32;
    if windspeed_raw == 0 {
        // possible but uncommon
        score += 2;
    } else if wind_speed <= 250.0 {
        score += 19;
    } else {
        return 0;
    }

    let mut sat = sat_raw as f32 * 0.25;
    if sat_sign {
        sat -= 128.0;
    }
    if sat == 0.0 {
        // possible but uncommon
        score += 2;
    } else if (-80.0..=60.0).contains(&sat) {
        score += 11;
    } else {
        return 0;
    }

    let asp = asp_raw as f32;
    if asp_valid {
        if (25.0..=1100.0).contains(&asp) {
            score += 12;
        } else {
            return 0;
        }
    } else {
        score += 1;
    }

    if turbulence_valid {
        score += 3;
    } else {
        score += 1;
    }

    let humidity = humidity_raw as f32 * (100.0 / 64.0);
    if humidity_valid {
        score += 7;
    } else {
        score += 1;
    }

    // A GICB capability report advertising the BDS 0,7 / 0,8 / 0,9 ES
    // registers plus BDS 6,0 reads back as source = DME/DME with the wind
    // and temperature status bits set and mostly-zero trailing bits. Clamp
    // the score so a DME/DME report only wins as a last resort.
    if source == MrarSource::DmeDme && score > 0 {
        score = 1;
    }

    if store {
        mm.commb_format = CommBFormat::Mrar;
        mm.mrar_source = Some(source);
        mm.wind = Some(Wind {
            speed: wind_speed,
            direction: wind_dir,
        });
        mm.temperature = Some(sat);
        if asp_valid {
            mm.pressure = Some(asp);
        }
        if turbulence_valid {
            mm.turbulence = Some(Turbulence::from_raw(turbulence_raw));
        }
        if humidity_valid {
            mm.humidity = Some(humidity);
        }
    }

    score
}

// BDS 0,5 extended squitter airborne position, read back over Comm-B.
//
// Some transponders answer a GICB interrogation for this register. The
// position is never used, but recognising the register keeps these replies
// from being mistaken for other registers, the MRAR in particular. The
// altitude inside the payload is matched against the AC field of the
// surrounding frame, which only exists on DF20.
fn decode_bds05(mm: &mut ModesMessage, store: bool) -> i32 {
    if mm.msg_type != 20 {
        return 0;
    }

    let msg = &mm.mb;

    let typecode = bits(msg, 1, 5);
    if !(9..=18).contains(&typecode) {
        // only barometric airborne position typecodes qualify
        return 0;
    }

    if bit(msg, 21) == 1 {
        // UTC-synchronised timing, unlikely
        return 0;
    }

    let ac12 = bits(msg, 9, 20);
    if ac12 == 0 {
        return 0;
    }

    // Insert M=0 to widen AC12 to AC13 and match the frame altitude
    let ac13 = ((ac12 & 0x0FC0) << 1) | (ac12 & 0x003F);
    if u32::from(mm.ac) != ac13 {
        return 0;
    }

    let lat = bits(msg, 23, 39);
    let lon = bits(msg, 40, 56);
    if lat == 0 || lon == 0 {
        // unlikely position
        return 0;
    }

    if store {
        mm.commb_format = CommBFormat::AirbornePosition;
        // The fields are not extracted; a position sneaking in over Comm-B
        // is not trustworthy enough to feed into CPR decoding.
    }

    // Above the maximum of every other decoder so a recognised position
    // always wins outright.
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commb_message(mb: [u8; 7]) -> ModesMessage {
        let mut mm = ModesMessage::default();
        mm.msg_type = 21;
        mm.mb = mb;
        mm
    }

    fn assert_no_fields(mm: &ModesMessage) {
        assert!(mm.callsign.is_none());
        assert!(mm.nav.mcp_altitude.is_none());
        assert!(mm.nav.fms_altitude.is_none());
        assert!(mm.nav.qnh.is_none());
        assert!(mm.nav.modes.is_none());
        assert!(mm.nav.altitude_source.is_none());
        assert!(mm.roll.is_none());
        assert!(mm.heading.is_none());
        assert!(mm.heading_type.is_none());
        assert!(mm.gs.is_none());
        assert!(mm.track_rate.is_none());
        assert!(mm.tas.is_none());
        assert!(mm.ias.is_none());
        assert!(mm.mach.is_none());
        assert!(mm.baro_rate.is_none());
        assert!(mm.geom_rate.is_none());
        assert!(mm.mrar_source.is_none());
        assert!(mm.wind.is_none());
        assert!(mm.temperature.is_none());
        assert!(mm.pressure.is_none());
        assert!(mm.turbulence.is_none());
        assert!(mm.humidity.is_none());
    }

    #[test]
    fn test_framing_refusal() {
        for (dr, um, corrected) in [(1, 0, 0), (0, 1, 0), (0, 0, 1)] {
            let mut mm = commb_message([0x20, 0x04, 0x20, 0xF1, 0xCB, 0x38, 0x20]);
            mm.dr = dr;
            mm.um = um;
            mm.corrected_bits = corrected;
            decode_commb(&mut mm);
            assert_eq!(mm.commb_format, CommBFormat::NotDecoded);
            assert_no_fields(&mm);
        }
    }

    #[test]
    fn test_empty_response_variants() {
        for first in [0x00, 0x40, 0x50, 0x60] {
            let mut mm = commb_message([first, 0, 0, 0, 0, 0, 0]);
            decode_commb(&mut mm);
            assert_eq!(mm.commb_format, CommBFormat::EmptyResponse);
            assert_no_fields(&mm);
        }
    }

    #[test]
    fn test_empty_response_requires_zero_tail() {
        let mut mm = commb_message([0x00, 0, 0, 0, 0, 0, 0x01]);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::Unknown);
        assert_no_fields(&mm);
    }

    #[test]
    fn test_unknown_payload() {
        let mut mm = commb_message([0xFF; 7]);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::Unknown);
        assert_no_fields(&mm);
    }

    #[test]
    fn test_datalink_caps() {
        let mut mm = commb_message([0x10, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00]);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::DatalinkCaps);
    }

    #[test]
    fn test_datalink_caps_reserved_bits() {
        // Reserved bits 10..14 set: not a BDS 1,0, and nothing else matches
        let mut mm = commb_message([0x10, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00]);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::Unknown);
    }

    #[test]
    fn test_acas_ra() {
        let mut mm = commb_message([0x30, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::AcasRa);
    }

    #[test]
    fn test_gicb_caps() {
        // ES capable with EDI, ident, vertical intent, track/turn and
        // heading/speed: a common capability mix
        let mut mm = commb_message([0xFE, 0x81, 0x01, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(decode_bds17(&mut mm, false), 10);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::GicbCaps);
    }

    #[test]
    fn test_gicb_rejects_trailing_bits() {
        let mut mm = commb_message([0xFE, 0x81, 0x01, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(decode_bds17(&mut mm, false), 0);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::Unknown);
    }

    #[test]
    fn test_aircraft_ident() {
        // "ABC123  "
        let mut mm = commb_message([0x20, 0x04, 0x20, 0xF1, 0xCB, 0x38, 0x20]);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::AircraftIdent);
        assert_eq!(mm.callsign.as_deref(), Some("ABC123  "));
    }

    #[test]
    fn test_aircraft_ident_all_padding() {
        // An idle BDS 2,0 is still the register, but yields no callsign
        let mut mm = commb_message([0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(decode_bds20(&mut mm, false), 8);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::AircraftIdent);
        assert!(mm.callsign.is_none());
    }

    #[test]
    fn test_aircraft_ident_rejects_invalid_chars() {
        // Second character decodes to index 35, outside [A-Z0-9 @]
        let mut mm = commb_message([0x20, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(decode_bds20(&mut mm, false), 0);
    }

    #[test]
    fn test_aircraft_ident_idempotent() {
        let mut mm = commb_message([0x20, 0x04, 0x20, 0xF1, 0xCB, 0x38, 0x20]);
        decode_commb(&mut mm);
        let first = mm.callsign.clone();
        let mut mm2 = commb_message([0x20, 0x04, 0x20, 0xF1, 0xCB, 0x38, 0x20]);
        decode_commb(&mut mm2);
        assert_eq!(first, mm2.callsign);
        assert_eq!(mm.commb_format, mm2.commb_format);
    }

    #[test]
    fn test_vertical_intent() {
        // MCP 10000 ft, QNH 1013.2 hPa, VNAV + altitude hold, source MCP
        let mut mm = commb_message([0x93, 0x88, 0x00, 0x30, 0xA8, 0x01, 0xC6]);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::VerticalIntent);
        assert_eq!(mm.nav.mcp_altitude, Some(10000));
        assert_eq!(mm.nav.fms_altitude, None);
        let qnh = mm.nav.qnh.unwrap();
        assert!((qnh - 1013.2).abs() < 0.05);
        assert_eq!(
            mm.nav.modes,
            Some(NavModes {
                vnav: true,
                alt_hold: true,
                approach: false,
            })
        );
        assert_eq!(mm.nav.altitude_source, Some(NavAltitudeSource::Mcp));
    }

    #[test]
    fn test_vertical_intent_divergent_selection_penalty() {
        // MCP 10000 ft vs FMS 12000 ft: both decode, minus the mismatch
        let mut mm = commb_message([0x93, 0x8C, 0xBB, 0x80, 0x00, 0x00, 0x00]);
        assert_eq!(decode_bds40(&mut mm, false), 25);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::VerticalIntent);
        assert_eq!(mm.nav.mcp_altitude, Some(10000));
        assert_eq!(mm.nav.fms_altitude, Some(12000));
    }

    #[test]
    fn test_vertical_intent_all_invalid() {
        let mut mm = commb_message([0x00; 7]);
        assert_eq!(decode_bds40(&mut mm, false), 0);
    }

    #[test]
    fn test_track_turn() {
        // roll +4.9, track 270, GS 450, track rate +1.0, TAS 460
        let mut mm = commb_message([0x83, 0x9C, 0x01, 0x38, 0x61, 0x04, 0xE6]);
        assert!(decode_bds50(&mut mm, false) >= 56);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::TrackTurn);
        let roll = mm.roll.unwrap();
        assert!((roll - 4.92).abs() < 0.01);
        assert_eq!(mm.heading, Some(270.0));
        assert_eq!(mm.heading_type, Some(HeadingType::GroundTrack));
        let gs = mm.gs.unwrap();
        assert_eq!(gs.selected, 450.0);
        assert_eq!(gs.v0, 450.0);
        assert_eq!(gs.v2, 450.0);
        assert_eq!(mm.track_rate, Some(1.0));
        assert_eq!(mm.tas, Some(460));
    }

    #[test]
    fn test_track_turn_speed_mismatch_penalty() {
        // GS 100 kt against TAS 300 kt trips the consistency penalty
        let mut mm = commb_message([0x80, 0x10, 0x01, 0x0C, 0x80, 0x04, 0x96]);
        assert_eq!(decode_bds50(&mut mm, false), 40);
    }

    #[test]
    fn test_track_turn_turn_rate_penalty() {
        // 30 degrees of bank at 100 kt TAS with a reported zero track rate
        let mut mm = commb_message([0x95, 0x70, 0x01, 0x0C, 0xA0, 0x04, 0x32]);
        assert_eq!(decode_bds50(&mut mm, false), 50);
    }

    #[test]
    fn test_track_turn_requires_core_fields() {
        // roll status cleared
        let mut mm = commb_message([0x03, 0x9C, 0x01, 0x38, 0x61, 0x04, 0xE6]);
        assert_eq!(decode_bds50(&mut mm, false), 0);
    }

    #[test]
    fn test_heading_speed() {
        // heading 135, IAS 280, Mach 0.8, both rates -1024 ft/min
        let mut mm = commb_message([0xB0, 0x0A, 0x31, 0x32, 0x3F, 0x07, 0xE0]);
        assert_eq!(decode_bds60(&mut mm, false), 56);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::HeadingSpeed);
        assert_eq!(mm.heading, Some(135.0));
        assert_eq!(mm.heading_type, Some(HeadingType::Magnetic));
        assert_eq!(mm.ias, Some(280));
        let mach = mm.mach.unwrap();
        assert!((mach - 0.8).abs() < 0.001);
        assert_eq!(mm.baro_rate, Some(-1024));
        assert_eq!(mm.geom_rate, Some(-1024));
    }

    #[test]
    fn test_heading_speed_rate_divergence_penalty() {
        // Baro +3200 against inertial +320 ft/min
        let mut mm = commb_message([0x80, 0x08, 0xC9, 0x19, 0x23, 0x24, 0x0A]);
        assert_eq!(decode_bds60(&mut mm, false), 44);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::HeadingSpeed);
        assert_eq!(mm.baro_rate, Some(3200));
        assert_eq!(mm.geom_rate, Some(320));
    }

    #[test]
    fn test_mrar() {
        // INS source, wind 45 kt at 90 deg, SAT -40 C, ASP 250 hPa,
        // light turbulence, humidity 50%
        let mut mm = commb_message([0x18, 0xB5, 0x01, 0xD8, 0x23, 0xEA, 0xE0]);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::Mrar);
        assert_eq!(mm.mrar_source, Some(MrarSource::Ins));
        let wind = mm.wind.unwrap();
        assert_eq!(wind.speed, 45.0);
        assert_eq!(wind.direction, 90.0);
        assert_eq!(mm.temperature, Some(-40.0));
        assert_eq!(mm.pressure, Some(250.0));
        assert_eq!(mm.turbulence, Some(Turbulence::Light));
        assert_eq!(mm.humidity, Some(50.0));
    }

    #[test]
    fn test_mrar_rejects_bad_sources() {
        // Source 0 is the invalid marker, 5 and up are reserved
        let mut mm = commb_message([0x08, 0xB5, 0x01, 0xD8, 0x23, 0xEA, 0xE0]);
        assert_eq!(decode_bds44(&mut mm, false), 0);
        let mut mm = commb_message([0x58, 0xB5, 0x01, 0xD8, 0x23, 0xEA, 0xE0]);
        assert_eq!(decode_bds44(&mut mm, false), 0);
    }

    #[test]
    fn test_mrar_gicb_collision_prefers_gicb() {
        // A GICB report advertising BDS 0,7/0,8/0,9, 2,0, 5,0 and 6,0 also
        // parses as a DME/DME MRAR with wind and temperature; the clamp
        // must leave the GICB reading on top.
        let mut mm = commb_message([0x3A, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(decode_bds44(&mut mm, false), 1);
        assert_eq!(decode_bds17(&mut mm, false), 6);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::GicbCaps);
        assert!(mm.mrar_source.is_none());
        assert!(mm.wind.is_none());
    }

    #[test]
    fn test_airborne_position_recognised_on_df20() {
        let mut mm = commb_message([0x58, 0x19, 0x50, 0x00, 0x02, 0x00, 0x01]);
        mm.msg_type = 20;
        mm.ac = 0x0315;
        assert_eq!(decode_bds05(&mut mm, false), 100);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::AirbornePosition);
        assert_no_fields(&mm);
    }

    #[test]
    fn test_airborne_position_needs_df20() {
        let mut mm = commb_message([0x58, 0x19, 0x50, 0x00, 0x02, 0x00, 0x01]);
        mm.ac = 0x0315;
        assert_eq!(decode_bds05(&mut mm, false), 0);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::Unknown);
    }

    #[test]
    fn test_airborne_position_needs_altitude_match() {
        let mut mm = commb_message([0x58, 0x19, 0x50, 0x00, 0x02, 0x00, 0x01]);
        mm.msg_type = 20;
        mm.ac = 0x0316;
        assert_eq!(decode_bds05(&mut mm, false), 0);
    }

    #[test]
    fn test_ambiguous_payload() {
        // Valid under both the BDS 5,0 and BDS 6,0 layouts with an equal
        // score of 56, so the arbiter must refuse to pick
        let mut mm = commb_message([0x80, 0x18, 0xC9, 0x19, 0x21, 0x94, 0x64]);
        assert_eq!(decode_bds50(&mut mm, false), 56);
        assert_eq!(decode_bds60(&mut mm, false), 56);
        decode_commb(&mut mm);
        assert_eq!(mm.commb_format, CommBFormat::Ambiguous);
        assert_no_fields(&mm);
    }
}

//! Write frames and their wire format.
//!
//! ```text
//! <lenH><lenL> <'w'> <delay> <start_index> <light_count> <r1><g1><b1>... <0x00>
//! ```
//!
//! The big-endian length counts the command byte through the last color byte;
//! it excludes itself and the trailing sentinel.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{Error, FrameField, Result};
use crate::led::color::{ColorResolver, RGB};

/// Command byte of a write frame.
pub const WRITE_COMMAND: u8 = b'w';
/// End-of-frame marker.
pub const SENTINEL: u8 = 0x00;
/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX_LEN: usize = 2;
/// Command, delay, start index and light count.
pub const HEADER_LEN: usize = 4;

/// An ordered list of color tokens.
///
/// A lone token converts into a one-element list, so `"blue"` and `["blue"]`
/// build the same one-light frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorTokens(Vec<String>);

impl ColorTokens {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for ColorTokens {
    fn from(token: &str) -> Self {
        ColorTokens(vec![token.to_string()])
    }
}

impl From<String> for ColorTokens {
    fn from(token: String) -> Self {
        ColorTokens(vec![token])
    }
}

impl From<Vec<String>> for ColorTokens {
    fn from(tokens: Vec<String>) -> Self {
        ColorTokens(tokens)
    }
}

impl From<Vec<&str>> for ColorTokens {
    fn from(tokens: Vec<&str>) -> Self {
        tokens.as_slice().into()
    }
}

impl From<&[&str]> for ColorTokens {
    fn from(tokens: &[&str]) -> Self {
        ColorTokens(tokens.iter().map(|token| token.to_string()).collect())
    }
}

impl From<&[String]> for ColorTokens {
    fn from(tokens: &[String]) -> Self {
        ColorTokens(tokens.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for ColorTokens {
    fn from(tokens: [&str; N]) -> Self {
        tokens.as_slice().into()
    }
}

/// Header values and padding for a frame under construction.
///
/// Fields are wider than the wire format so out-of-range values can be
/// reported instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOptions {
    /// Pad the frame with black up to this many lights.
    pub light_count: Option<usize>,
    /// Delay after the write, in milliseconds.
    pub delay: usize,
    /// First light to change.
    pub start_index: usize,
}

impl FrameOptions {
    pub fn with_light_count(mut self, light_count: usize) -> Self {
        self.light_count = Some(light_count);
        self
    }

    pub fn with_delay(mut self, delay: usize) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index;
        self
    }
}

fn field_byte(field: FrameField, value: usize) -> Result<u8> {
    u8::try_from(value).map_err(|_| Error::ProtocolRange { field, value })
}

/// One complete unit of light state sent to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    delay: u8,
    start_index: u8,
    lights: Vec<RGB>,
}

impl Frame {
    /// Resolves every token and builds a frame.
    ///
    /// Fails on the first unknown token, before padding or range checks.
    pub fn from_tokens(
        tokens: impl Into<ColorTokens>,
        resolver: &ColorResolver,
        options: FrameOptions,
    ) -> Result<Self> {
        let tokens = tokens.into();
        if tokens.is_empty() {
            return Err(Error::EmptyFrame);
        }
        let colors = tokens
            .iter()
            .map(|token| resolver.resolve(token))
            .collect::<Result<Vec<RGB>>>()?;
        Self::from_colors(colors, options)
    }

    /// Builds a frame from already resolved colors. No brightness is applied.
    pub fn from_colors(
        colors: impl IntoIterator<Item = RGB>,
        options: FrameOptions,
    ) -> Result<Self> {
        let mut lights: Vec<RGB> = colors.into_iter().collect();
        let total = options.light_count.unwrap_or(0).max(lights.len());
        field_byte(FrameField::LightCount, total)?;
        let delay = field_byte(FrameField::Delay, options.delay)?;
        let start_index = field_byte(FrameField::StartIndex, options.start_index)?;

        lights.resize(total, RGB::BLACK);
        Ok(Frame {
            delay,
            start_index,
            lights,
        })
    }

    pub fn lights(&self) -> &[RGB] {
        &self.lights
    }

    pub fn light_count(&self) -> u8 {
        // from_colors and decode both cap the length at 255
        self.lights.len() as u8
    }

    pub fn delay(&self) -> u8 {
        self.delay
    }

    pub fn start_index(&self) -> u8 {
        self.start_index
    }

    /// Value of the length prefix: header plus color bytes.
    pub fn command_len(&self) -> usize {
        HEADER_LEN + 3 * self.lights.len()
    }

    /// Total number of bytes on the wire.
    pub fn encoded_len(&self) -> usize {
        LENGTH_PREFIX_LEN + self.command_len() + 1
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut packet = BytesMut::with_capacity(self.encoded_len());
        packet.put_u16(self.command_len() as u16);
        packet.put_u8(WRITE_COMMAND);
        packet.put_u8(self.delay);
        packet.put_u8(self.start_index);
        packet.put_u8(self.light_count());
        for light in &self.lights {
            packet.put_slice(&light.to_bytes());
        }
        packet.put_u8(SENTINEL);
        packet.freeze()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parses exactly one frame; trailing bytes are an error.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (frame, used) = Self::decode_prefix(data)?;
        if used != data.len() {
            return Err(Error::MalformedFrame(format!(
                "{} trailing bytes after frame",
                data.len() - used
            )));
        }
        Ok(frame)
    }

    /// Parses the frame at the start of `data` and returns it together with
    /// the number of bytes it occupied.
    pub fn decode_prefix(data: &[u8]) -> Result<(Self, usize)> {
        let min_len = LENGTH_PREFIX_LEN + HEADER_LEN + 1;
        if data.len() < min_len {
            return Err(Error::MalformedFrame(format!(
                "need at least {} bytes, got {}",
                min_len,
                data.len()
            )));
        }

        let command_len = u16::from_be_bytes([data[0], data[1]]) as usize;
        let total = LENGTH_PREFIX_LEN + command_len + 1;
        if command_len < HEADER_LEN || data.len() < total {
            return Err(Error::MalformedFrame(format!(
                "length prefix {} does not match {} available bytes",
                command_len,
                data.len()
            )));
        }

        let command = &data[LENGTH_PREFIX_LEN..LENGTH_PREFIX_LEN + command_len];
        if command[0] != WRITE_COMMAND {
            return Err(Error::MalformedFrame(format!(
                "unknown command byte 0x{:02x}",
                command[0]
            )));
        }
        let light_count = command[3] as usize;
        if command_len != HEADER_LEN + 3 * light_count {
            return Err(Error::MalformedFrame(format!(
                "{} lights need a length of {}, prefix says {}",
                light_count,
                HEADER_LEN + 3 * light_count,
                command_len
            )));
        }
        if data[total - 1] != SENTINEL {
            return Err(Error::MalformedFrame(format!(
                "expected sentinel 0x00, found 0x{:02x}",
                data[total - 1]
            )));
        }

        let lights = command[HEADER_LEN..]
            .chunks_exact(3)
            .map(|chunk| RGB::new(chunk[0], chunk[1], chunk[2]))
            .collect();
        let frame = Frame {
            delay: command[1],
            start_index: command[2],
            lights,
        };
        Ok((frame, total))
    }
}

/// Resolves `tokens` and returns the wire bytes of the resulting frame.
pub fn encode(
    tokens: impl Into<ColorTokens>,
    resolver: &ColorResolver,
    options: FrameOptions,
) -> Result<Bytes> {
    Frame::from_tokens(tokens, resolver, options).map(|frame| frame.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::color::Brightness;

    const SCENARIO: [&str; 6] = [":blue", ":blue", ":blue", ":green", ":green", ":blue"];

    #[test]
    fn test_scenario_frame() {
        let bytes = encode(SCENARIO, &ColorResolver::default(), FrameOptions::default()).unwrap();

        assert_eq!(&bytes[..2], &[0x00, 0x16]);
        assert_eq!(&bytes[2..6], &[0x77, 0x00, 0x00, 0x06]);
        assert_eq!(&bytes[6..9], &[0, 0, 5]);
        assert_eq!(&bytes[15..18], &[0, 2, 0]);
        assert_eq!(bytes.len(), 2 + 4 + 18 + 1);
        assert_eq!(bytes.last(), Some(&0x00));
    }

    #[test]
    fn test_scenario_hex() {
        let frame = Frame::from_tokens(SCENARIO, &ColorResolver::default(), FrameOptions::default())
            .unwrap();
        assert_eq!(
            frame.to_hex(),
            "00167700000600000500000500000500020000020000000500"
        );
    }

    #[test]
    fn test_encoded_length_law() {
        let resolver = ColorResolver::new(Brightness::FULL);
        for count in [1usize, 2, 17, 128, 254, 255] {
            let tokens = vec!["#102030"; count];
            let bytes = encode(tokens, &resolver, FrameOptions::default()).unwrap();
            assert_eq!(bytes.len(), 2 + 4 + 3 * count + 1);
            let prefix = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
            assert_eq!(prefix, 4 + 3 * count);
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let resolver = ColorResolver::default();
        let options = FrameOptions::default().with_delay(12).with_start_index(3);
        let first = encode(SCENARIO, &resolver, options).unwrap();
        let second = encode(SCENARIO, &resolver, options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_token_is_one_light() {
        let resolver = ColorResolver::new(Brightness::FULL);
        let frame = Frame::from_tokens("red", &resolver, FrameOptions::default()).unwrap();
        assert_eq!(frame.lights(), &[RGB::new(255, 0, 0)]);
        assert_eq!(
            frame,
            Frame::from_tokens(["red"], &resolver, FrameOptions::default()).unwrap()
        );
    }

    #[test]
    fn test_padding_law() {
        let resolver = ColorResolver::new(Brightness::FULL);
        let options = FrameOptions::default().with_light_count(10);
        let frame = Frame::from_tokens(["red", "lime", "blue"], &resolver, options).unwrap();
        assert_eq!(frame.light_count(), 10);
        assert_eq!(frame.lights()[2], RGB::new(0, 0, 255));
        assert!(frame.lights()[3..].iter().all(|light| *light == RGB::BLACK));
    }

    #[test]
    fn test_light_count_below_colors_does_not_truncate() {
        let resolver = ColorResolver::new(Brightness::FULL);
        let options = FrameOptions::default().with_light_count(1);
        let frame = Frame::from_tokens(["red", "blue"], &resolver, options).unwrap();
        assert_eq!(frame.light_count(), 2);
    }

    #[test]
    fn test_range_law_light_count() {
        let resolver = ColorResolver::default();
        assert!(encode(vec!["black"; 255], &resolver, FrameOptions::default()).is_ok());

        let err = encode(vec!["black"; 256], &resolver, FrameOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::ProtocolRange {
                field: FrameField::LightCount,
                value: 256
            }
        ));

        let padded = FrameOptions::default().with_light_count(300);
        let err = encode("black", &resolver, padded).unwrap_err();
        assert!(matches!(
            err,
            Error::ProtocolRange {
                field: FrameField::LightCount,
                value: 300
            }
        ));
    }

    #[test]
    fn test_range_law_header_fields() {
        let resolver = ColorResolver::default();
        let err = encode("black", &resolver, FrameOptions::default().with_delay(256)).unwrap_err();
        assert!(matches!(err, Error::ProtocolRange { field: FrameField::Delay, .. }));

        let err =
            encode("black", &resolver, FrameOptions::default().with_start_index(1000)).unwrap_err();
        assert!(matches!(err, Error::ProtocolRange { field: FrameField::StartIndex, .. }));

        let options = FrameOptions::default().with_delay(255).with_start_index(255);
        let bytes = encode("black", &resolver, options).unwrap();
        assert_eq!(&bytes[3..5], &[255, 255]);
    }

    #[test]
    fn test_unknown_color_fails_fast() {
        let err = encode(
            ["blue", "not-a-color", "also-bad"],
            &ColorResolver::default(),
            FrameOptions::default().with_delay(999),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownColor(ref token) if token == "not-a-color"));
    }

    #[test]
    fn test_empty_tokens_rejected() {
        let tokens: Vec<&str> = Vec::new();
        let err = encode(tokens, &ColorResolver::default(), FrameOptions::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyFrame));
    }

    #[test]
    fn test_from_colors_raw_values() {
        let options = FrameOptions::default().with_delay(5).with_start_index(2);
        let frame = Frame::from_colors([RGB::new(1, 2, 3), RGB::new(4, 5, 6)], options).unwrap();
        assert_eq!(
            frame.to_bytes().as_ref(),
            &[0x00, 0x0a, 0x77, 5, 2, 2, 1, 2, 3, 4, 5, 6, 0x00]
        );
    }

    #[test]
    fn test_frame_serializes_lights() {
        let frame = Frame::from_colors([RGB::new(1, 2, 3)], FrameOptions::default().with_delay(4))
            .unwrap();
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "delay": 4,
                "start_index": 0,
                "lights": [{ "red": 1, "green": 2, "blue": 3 }]
            })
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let options = FrameOptions::default().with_delay(40).with_start_index(7);
        let frame = Frame::from_tokens(SCENARIO, &ColorResolver::default(), options).unwrap();
        assert_eq!(Frame::decode(&frame.to_bytes()).unwrap(), frame);
    }

    #[test]
    fn test_decode_prefix_of_stream() {
        let a = Frame::from_colors([RGB::new(1, 1, 1)], FrameOptions::default()).unwrap();
        let b = Frame::from_colors([RGB::new(2, 2, 2); 3], FrameOptions::default()).unwrap();
        let mut stream = a.to_bytes().to_vec();
        stream.extend_from_slice(&b.to_bytes());

        let (first, used) = Frame::decode_prefix(&stream).unwrap();
        assert_eq!(first, a);
        assert_eq!(used, a.encoded_len());
        assert_eq!(Frame::decode(&stream[used..]).unwrap(), b);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let good = Frame::from_colors([RGB::new(9, 9, 9)], FrameOptions::default())
            .unwrap()
            .to_bytes()
            .to_vec();

        assert!(matches!(Frame::decode(&good[..4]), Err(Error::MalformedFrame(_))));

        let mut bad_command = good.clone();
        bad_command[2] = b'r';
        assert!(matches!(Frame::decode(&bad_command), Err(Error::MalformedFrame(_))));

        let mut bad_sentinel = good.clone();
        *bad_sentinel.last_mut().unwrap() = 0xff;
        assert!(matches!(Frame::decode(&bad_sentinel), Err(Error::MalformedFrame(_))));

        let mut bad_count = good.clone();
        bad_count[5] = 2;
        assert!(matches!(Frame::decode(&bad_count), Err(Error::MalformedFrame(_))));

        let mut trailing = good;
        trailing.push(0);
        assert!(matches!(Frame::decode(&trailing), Err(Error::MalformedFrame(_))));
    }
}

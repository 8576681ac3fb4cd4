use std::io::{BufRead, Write};

use super::Codec;
use crate::error::ContainerError;
use crate::palette::{ColorPalette, ColorSlice, Rgb};

fn parse_value(token: &str, line: usize) -> Result<f64, ContainerError> {
    token
        .parse::<f64>()
        .map_err(|_| ContainerError::parse(line, format!("not a number: {token:?}")))
}

/// Parses `r/g/b` or a single gray level.
fn parse_color(token: &str, line: usize) -> Result<Rgb, ContainerError> {
    let parts: Vec<&str> = token.split('/').collect();
    match parts.as_slice() {
        [gray] => {
            let v = parse_value(gray, line)?;
            Ok([v, v, v])
        }
        [r, g, b] => Ok([
            parse_value(r, line)?,
            parse_value(g, line)?,
            parse_value(b, line)?,
        ]),
        _ => Err(ContainerError::parse(line, format!("bad color {token:?}"))),
    }
}

/// Parses a color given either as one token or as three.
fn parse_color_tokens(tokens: &[&str], line: usize) -> Result<Rgb, ContainerError> {
    match tokens {
        [one] => parse_color(one, line),
        [r, g, b] => Ok([
            parse_value(r, line)?,
            parse_value(g, line)?,
            parse_value(b, line)?,
        ]),
        _ => Err(ContainerError::parse(line, "expected a color")),
    }
}

fn fmt_color(rgb: &Rgb) -> String {
    format!("{}/{}/{}", rgb[0], rgb[1], rgb[2])
}

impl Codec for ColorPalette {
    fn decode(reader: &mut dyn BufRead) -> Result<Self, ContainerError> {
        let mut palette = Self::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let (body, label) = match text.split_once(';') {
                Some((body, label)) => (body, Some(label.trim().to_string())),
                None => (text, None),
            };
            let tokens: Vec<&str> = body.split_whitespace().collect();
            match tokens.as_slice() {
                ["B", rest @ ..] => palette.background = parse_color_tokens(rest, line_no)?,
                ["F", rest @ ..] => palette.foreground = parse_color_tokens(rest, line_no)?,
                ["N", rest @ ..] => palette.nan_color = parse_color_tokens(rest, line_no)?,
                [z0, c0, z1, c1] => palette.slices.push(ColorSlice {
                    z_low: parse_value(z0, line_no)?,
                    rgb_low: parse_color(c0, line_no)?,
                    z_high: parse_value(z1, line_no)?,
                    rgb_high: parse_color(c1, line_no)?,
                    label,
                }),
                [z0, r0, g0, b0, z1, r1, g1, b1] => palette.slices.push(ColorSlice {
                    z_low: parse_value(z0, line_no)?,
                    rgb_low: parse_color_tokens(&[*r0, *g0, *b0], line_no)?,
                    z_high: parse_value(z1, line_no)?,
                    rgb_high: parse_color_tokens(&[*r1, *g1, *b1], line_no)?,
                    label,
                }),
                _ => {
                    return Err(ContainerError::parse(
                        line_no,
                        format!("unrecognized palette line {text:?}"),
                    ));
                }
            }
        }
        Ok(palette)
    }

    fn encode(&self, writer: &mut dyn Write) -> Result<(), ContainerError> {
        for slice in &self.slices {
            write!(
                writer,
                "{}\t{}\t{}\t{}",
                slice.z_low,
                fmt_color(&slice.rgb_low),
                slice.z_high,
                fmt_color(&slice.rgb_high)
            )?;
            match &slice.label {
                Some(label) => writeln!(writer, "\t;{label}")?,
                None => writeln!(writer)?,
            }
        }
        writeln!(writer, "B\t{}", fmt_color(&self.background))?;
        writeln!(writer, "F\t{}", fmt_color(&self.foreground))?;
        writeln!(writer, "N\t{}", fmt_color(&self.nan_color))?;
        Ok(())
    }
}

//! File-to-file rendering through the public API

use tb_core::ParamSnapshot;
use tb_render::{Overrides, read_wav, render, write_wav};

fn write_int16_sine(path: &std::path::Path, frames: usize) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for n in 0..frames {
        let s = (2.0 * std::f64::consts::PI * 1000.0 * n as f64 / 44100.0).sin() * 0.5;
        let v = (s * 32767.0) as i16;
        writer.write_sample(v).unwrap();
        writer.write_sample(v).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_int16_file_renders_to_float_file() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("in.wav");
    let output_path = dir.path().join("out.wav");
    write_int16_sine(&input_path, 22050);

    let input = read_wav(&input_path).unwrap();
    assert_eq!(input.channels, 2);
    assert_eq!(input.num_frames(), 22050);

    let mut params = ParamSnapshot::default();
    Overrides {
        bypass: [true, true, true],
        ..Default::default()
    }
    .apply(&mut params);

    let (rendered, report) = render(&input, &params, 300).unwrap();
    write_wav(&output_path, &rendered).unwrap();

    let reader = hound::WavReader::open(&output_path).unwrap();
    assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
    assert_eq!(reader.spec().sample_rate, 44100);
    assert_eq!(reader.len() as usize, input.samples.len());

    // Bypassed bands still pass through the crossover and 1/3 summation
    let ratio = report.output_peak / report.input_peak;
    assert!((0.2..0.5).contains(&ratio), "peak ratio {ratio}");
}

#[test]
fn test_missing_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_wav(&dir.path().join("missing.wav")).is_err());
}

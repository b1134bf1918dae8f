//! End-to-end scenarios over real files

use rand::rngs::StdRng;
use rand::SeedableRng;
use ru_cube::statistics::diff_files_with_progress;
use ru_cube::{
    join, linear_cube, random_cube, read_cube, read_raw_extracted, write_cube, BlockReducer,
    CountingReader, Cube, DiffInfo, DiffOptions, Dtype, Extractor, FileFormat, FormatOptions,
    HistogramMode, ReadOptions, Scalar, Session, Shape,
};
use std::fs::File;
use std::path::Path;
use tempfile::tempdir;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn test_linear_cube_read_back() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("linear.raw");
    let shape = Shape::parse("3x4x5").expect("Failed to parse shape");

    let cube = linear_cube(&shape, 0.0, 1.0, Dtype::Float32).expect("Failed to build cube");
    write_cube(&cube, &path, FileFormat::Raw, None, None, &FormatOptions::default())
        .expect("Failed to write cube");
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 60 * 4);

    let options = ReadOptions::default();
    let read = read_cube(&path, FileFormat::Raw, &shape, Dtype::Float32, None, &options)
        .expect("Failed to read cube");
    let values = read.to_vec::<f32>().unwrap();
    assert_eq!(values, (0..60).map(|v| v as f32).collect::<Vec<_>>());

    let stats = read.stats();
    assert_eq!(stats.sum(), Scalar::Float(1770.0));
    assert_eq!(stats.count(), 60);
    assert_eq!(stats.min(), Some(Scalar::Float(0.0)));
    assert_eq!(stats.max(), Some(Scalar::Float(59.0)));
    assert_eq!(stats.min_index(), Some(vec![0, 0, 0]));
    assert_eq!(stats.max_index(), Some(vec![2, 3, 4]));
}

#[test]
fn test_out_of_core_extraction_reads_only_selection() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("cube.raw");
    let shape = Shape::parse("8x10x20").unwrap();
    let cube = linear_cube(&shape, 0.0, 1.0, Dtype::Float32).unwrap();
    write_cube(&cube, &path, FileFormat::Raw, None, None, &FormatOptions::default()).unwrap();

    let extractor = Extractor::parse(":,2:-2,:").unwrap();
    let mut reader = CountingReader::new(File::open(&path).expect("Failed to open cube"));
    let array = read_raw_extracted::<f32, _>(&mut reader, &shape, Some(&extractor), 1)
        .expect("Failed to read extracted cube");

    assert_eq!(array.shape(), &[8, 6, 20]);
    assert!(reader.bytes_read() <= (8 * 6 * 20 * 4) as u64);
    assert_eq!(Cube::from(array), cube.extract(&extractor).unwrap());

    // the same selection through the file-level entry point
    let options = ReadOptions {
        min_size: 4,
        ..ReadOptions::default()
    };
    let read = read_cube(
        &path,
        FileFormat::Raw,
        &shape,
        Dtype::Float32,
        Some(&extractor),
        &options,
    )
    .unwrap();
    assert_eq!(read, cube.extract(&extractor).unwrap());
}

#[test]
fn test_split_write_and_join() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("cube.raw");
    let shape = Shape::parse("8x10x20").unwrap();
    let mut session = Session::new();
    let cube = session.linear_cube(&shape, 0.0, 1.0, None).unwrap();
    write_cube(&cube, &path, FileFormat::Raw, None, None, &session.format_options).unwrap();

    let extractor = Extractor::parse(":,::2,:").unwrap();
    let strided = session
        .read_cube(&path, FileFormat::Raw, &shape, None, Some(&extractor), None)
        .expect("Failed to read strided cube");
    assert_eq!(strided.shape(), &[8, 5, 20]);

    let template = temp_dir.path().join("part_{d1:02}.{format}");
    let template = template.to_str().unwrap();
    let mut parts = Vec::new();
    for (i, (subcube, labels)) in strided.split(&[1]).unwrap().enumerate() {
        assert_eq!(subcube.shape(), &[8, 20]);
        assert_eq!(labels.get("d1"), Some(i));
        assert_eq!(labels.len(), 1);

        let context = ru_cube::NameContext {
            shape: subcube.shape(),
            dtype: subcube.dtype(),
            format: FileFormat::Raw,
            labels: &labels,
        };
        let name = ru_cube::interpolate_filename(template, &context).unwrap();
        assert!(name.ends_with(&format!("part_{i:02}.raw")));
        let options = &session.format_options;
        write_cube(&subcube, Path::new(&name), FileFormat::Raw, None, None, options).unwrap();
        parts.push(subcube);
    }
    assert_eq!(parts.len(), 5);

    let part_shape = Shape::parse("8x20").unwrap();
    let reread: Vec<Cube> = (0..5)
        .map(|i| {
            let path = temp_dir.path().join(format!("part_{i:02}.raw"));
            session.read_cube(&path, FileFormat::Raw, &part_shape, None, None, None)
        })
        .collect::<ru_cube::Result<_>>()
        .expect("Failed to read parts");

    let joined = join(&reread).expect("Failed to join");
    assert_eq!(joined.shape(), &[5, 8, 20]);
    for (i, part) in parts.iter().enumerate() {
        assert_eq!(&joined.index_axis(0, i).unwrap(), part);
    }
}

#[test]
fn test_out_of_core_diff_matches_in_memory() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let left_path = temp_dir.path().join("left.raw");
    let right_path = temp_dir.path().join("right.raw");
    let shape = Shape::parse("100x100x100").unwrap();
    let options = FormatOptions::default();

    let draw = |seed| {
        random_cube(&shape, 0.0, 1.0, Dtype::Float32, &mut StdRng::seed_from_u64(seed)).unwrap()
    };
    let (left, right) = (draw(1), draw(2));
    write_cube(&left, &left_path, FileFormat::Raw, None, None, &options).unwrap();
    write_cube(&right, &right_path, FileFormat::Raw, None, None, &options).unwrap();

    let reducer = BlockReducer::new(2 * 1024 * 1024);
    let diff_options = DiffOptions::default();
    let mut reports = Vec::new();
    let diff = diff_files_with_progress(
        &left_path,
        &right_path,
        &shape,
        Dtype::Float32,
        &reducer,
        &diff_options,
        |partial, context| reports.push((context.progress(), partial.count())),
    )
    .expect("Failed to diff files");

    // four steps of 262144 elements: reports near 25, 50, 75 and 100 percent
    assert_eq!(reports.len(), 4);
    for (&(progress, count), target) in reports.iter().zip([0.25, 0.5, 0.75, 1.0]) {
        assert!(progress >= target && progress < target + 0.05, "progress {progress}");
        assert_eq!(count, (progress * 1e6).round() as usize);
    }

    let expected = DiffInfo::from_cubes(&left, &right, &diff_options).unwrap();
    assert_eq!(diff.count(), 1_000_000);
    for (ooc, mem) in [
        (&diff.left, &expected.left),
        (&diff.right, &expected.right),
        (&diff.rel_diff, &expected.rel_diff),
        (&diff.abs_diff, &expected.abs_diff),
    ] {
        assert_eq!(ooc.count(), mem.count());
        assert_eq!(ooc.min(), mem.min());
        assert_eq!(ooc.max(), mem.max());
        assert_eq!(ooc.min_index(), mem.min_index());
        assert_eq!(ooc.max_index(), mem.max_index());
        assert_eq!(ooc.zero_count(), mem.zero_count());
        assert!(close(ooc.sum().to_f64(), mem.sum().to_f64()));
    }
}

#[test]
fn test_histogram_percentages() {
    let shape = Shape::parse("6x4x5").unwrap();
    let mut rng = StdRng::seed_from_u64(100);
    let cube = random_cube(&shape, 0.0, 1.0, Dtype::Float32, &mut rng).unwrap();
    let histogram = ru_cube::Histogram::from_cube(&cube, 5, Some((0.0, 1.0))).unwrap();
    assert_eq!(histogram.total(), 120);

    let lines =
        ru_cube::histogram_lines(&cube, 5, Some((0.0, 1.0)), 80, HistogramMode::Percentage)
            .unwrap();
    assert_eq!(lines.len(), 5);
    let mut total_percentage = 0.0;
    for line in &lines {
        assert_eq!(line.chars().count(), 80, "line {line:?}");
        let value = line.rsplit(' ').next().unwrap().trim_end_matches('%');
        total_percentage += value.parse::<f64>().unwrap();
    }
    assert!((total_percentage - 100.0).abs() < 0.05);
}

#[test]
fn test_write_read_round_trip_all_formats() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let shape = Shape::parse("3x4").unwrap();
    let options = FormatOptions::default();

    for format in [FileFormat::Raw, FileFormat::Csv, FileFormat::Text] {
        for dtype in Dtype::ALL {
            let cube = linear_cube(&shape, 0.0, 0.25, dtype).unwrap();
            let path = temp_dir.path().join(format!("cube_{dtype}.{format}"));
            write_cube(&cube, &path, format, None, None, &options).unwrap();
            let read = read_cube(&path, format, &shape, dtype, None, &ReadOptions::default())
                .unwrap_or_else(|e| panic!("{format} {dtype}: {e}"));
            assert_eq!(read, cube, "{format} {dtype}");
        }
    }
}

#[test]
fn test_file_length_policy() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("cube.raw");
    let shape = Shape::parse("4x4").unwrap();
    let cube = linear_cube(&shape, 0.0, 1.0, Dtype::Int32).unwrap();
    write_cube(&cube, &path, FileFormat::Raw, None, None, &FormatOptions::default()).unwrap();

    let strict = ReadOptions::default();

    // too short
    let bigger = Shape::parse("5x4").unwrap();
    let err = read_cube(&path, FileFormat::Raw, &bigger, Dtype::Int32, None, &strict).unwrap_err();
    assert_eq!(err.kind(), ru_cube::ErrorKind::Io);
    assert!(err.to_string().contains("truncated"));

    // too long, fatal by default
    let smaller = Shape::parse("3x4").unwrap();
    let err =
        read_cube(&path, FileFormat::Raw, &smaller, Dtype::Int32, None, &strict).unwrap_err();
    assert!(matches!(err, ru_cube::RuCubeError::TooLong { .. }));

    // accepted on request
    let options = ReadOptions {
        accept_bigger_files: true,
        ..ReadOptions::default()
    };
    let read = read_cube(&path, FileFormat::Raw, &smaller, Dtype::Int32, None, &options).unwrap();
    assert_eq!(read.to_vec::<i32>().unwrap(), (0..12).collect::<Vec<_>>());

    // and implied by an offset
    let options = ReadOptions {
        offset: Some(16),
        ..ReadOptions::default()
    };
    let inner = Shape::parse("2x4").unwrap();
    let read = read_cube(&path, FileFormat::Raw, &inner, Dtype::Int32, None, &options).unwrap();
    assert_eq!(read.to_vec::<i32>().unwrap(), (4..12).collect::<Vec<_>>());

    // an offset that cannot be added to the cube size
    let options = ReadOptions {
        offset: Some(u64::MAX),
        ..ReadOptions::default()
    };
    let err =
        read_cube(&path, FileFormat::Raw, &smaller, Dtype::Int32, None, &options).unwrap_err();
    assert!(matches!(err, ru_cube::RuCubeError::InvalidArgument(_)));
}

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use marline_core::{BitReader, BitWrite, BitWriter, MeasureStream, SlidingWindow};

fn write_fields(stream: &mut dyn BitWrite, count: usize) {
    for i in 0..count {
        stream.write_int(i as u32 % 33, 0, 32).unwrap();
        stream.write_bits(i as u32 & 0xFFFF, 16).unwrap();
        stream.write_bits(i as u32 & 0x7, 3).unwrap();
    }
}

fn bench_bitstream(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitstream");

    for count in [32usize, 256] {
        let bytes = {
            let mut writer = BitWriter::new();
            write_fields(&mut writer, count);
            writer.finish()
        };
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("write", count), &count, |b, &n| {
            b.iter(|| {
                let mut writer = BitWriter::new();
                write_fields(&mut writer, n);
                writer.finish()
            });
        });

        group.bench_with_input(BenchmarkId::new("measure", count), &count, |b, &n| {
            b.iter(|| {
                let mut measure = MeasureStream::new();
                write_fields(&mut measure, n);
                measure.bits_written()
            });
        });

        group.bench_with_input(BenchmarkId::new("read", count), &bytes, |b, bytes| {
            b.iter(|| {
                let mut reader = BitReader::new(bytes);
                for _ in 0..count {
                    reader.read_int(0, 32).unwrap();
                    reader.read_bits(16).unwrap();
                    reader.read_bits(3).unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("window");

    group.bench_function("insert_find_remove", |b| {
        let mut window: SlidingWindow<u64> = SlidingWindow::new(1024);
        let mut sequence: u16 = 0;
        b.iter(|| {
            let _ = window.insert(sequence, u64::from(sequence));
            let found = window.find(sequence).copied();
            window.remove(sequence);
            sequence = sequence.wrapping_add(1);
            found
        });
    });

    group.bench_function("insert_fast_churn", |b| {
        let mut window: SlidingWindow<u64> = SlidingWindow::new(256);
        let mut sequence: u16 = 0;
        b.iter(|| {
            *window.insert_fast(sequence, 0) += 1;
            sequence = sequence.wrapping_add(1);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_bitstream, bench_window);
criterion_main!(benches);

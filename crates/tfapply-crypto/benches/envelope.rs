use secrecy::SecretString;
use tfapply_crypto::{decrypt, encrypt};

fn make_plan(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt_envelope(bencher: divan::Bencher, size: usize) {
    let passphrase = SecretString::from("bench-passphrase".to_string());
    let plan = make_plan(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| encrypt(divan::black_box(&plan), divan::black_box(&passphrase)));
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_decrypt_envelope(bencher: divan::Bencher, size: usize) {
    let passphrase = SecretString::from("bench-passphrase".to_string());
    let plan = make_plan(size);
    let envelope = encrypt(&plan, &passphrase);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            decrypt(
                divan::black_box(&envelope),
                divan::black_box(&passphrase),
            )
            .unwrap()
        });
}

fn main() {
    divan::main();
}

use std::collections::HashSet;
use std::sync::LazyLock;

/// Site furniture, outlet names and weekday names that survive light
/// cleaning for the embedding pipeline. Keep this list fixed.
pub const NOISE_WORDS: [&str; 59] = [
    "baca", "juga", "halaman", "editor", "penulis", "sumber", "foto", "wartawan",
    "reporter", "jakarta", "liputan6", "kompas", "tribun", "detik", "antara",
    "copyright", "all", "rights", "reserved", "news", "com", "co", "id", "tempo",
    "bbc", "kontan", "website", "video", "selanjutnya", "berikut", "redaksi",
    "jurnalis", "dok", "istimewa", "liputan", "laman", "klik", "tautan", "ini",
    "dilansir", "dikutip", "simak", "selengkapnya", "bergabung", "whatsapp",
    "channel", "saluran", "cnn", "cnbc", "republika", "link", "langsung",
    "senin", "selasa", "rabu", "kamis", "jumat", "sabtu", "minggu",
];

/// Journalistic filler used both as extra LDA stopwords and as the
/// vectoriser stoplist for cluster representations.
pub const JOURNALISTIC_STOPWORDS: &[&str] = &[
    "yang", "dan", "di", "ke", "dari", "ini", "itu", "untuk", "pada", "dengan",
    "adalah", "yaitu", "tersebut", "juga", "sudah", "telah", "akan", "sedang",
    "tapi", "tetapi", "melalui", "karena", "oleh", "sebagai", "bisa", "dapat",
    "seperti", "dalam", "antara", "bagi", "kepada", "agar", "supaya", "atau",
    "saya", "kita", "kami", "anda", "mereka", "dia", "ia", "beliau", "rp", "ndak",
    "mengatakan", "kata", "ujar", "tutur", "jelas", "ungkap", "sebut", "menurut",
    "menjadi", "melakukan", "memberikan", "mengambil", "memiliki", "ada", "tidak",
    "banyak", "sedikit", "besar", "kecil", "baru", "lama", "tinggi", "rendah",
    "sangat", "lebih", "paling", "kurang", "cukup", "sendiri", "lain", "tulis",
];

/// General Indonesian function words.
const INDONESIAN_BASE: &[&str] = &[
    "ada", "adalah", "adanya", "adapun", "agak", "agaknya", "agar", "akan", "akankah",
    "akhir", "akhirnya", "aku", "akulah", "amat", "amatlah", "anda", "andalah", "antar",
    "antara", "antaranya", "apa", "apaan", "apabila", "apakah", "apalagi", "apatah",
    "artinya", "asal", "asalkan", "atas", "atau", "ataukah", "ataupun", "awal", "awalnya",
    "bagai", "bagaikan", "bagaimana", "bagaimanakah", "bagaimanapun", "bagi", "bagian",
    "bahkan", "bahwa", "bahwasanya", "baik", "bakal", "bakalan", "balik", "banyak", "bapak",
    "baru", "bawah", "beberapa", "begini", "beginilah", "begitu", "begitulah", "begitupun",
    "belakang", "belakangan", "belum", "belumlah", "benar", "benarkah", "berada",
    "berakhir", "berapa", "berapakah", "berapapun", "berarti", "berawal", "berbagai",
    "berikan", "berikut", "berikutnya", "berjumlah", "berkata", "berkenaan", "berlainan",
    "berlalu", "berlangsung", "bermacam", "bermaksud", "bermula", "bersama", "bersiap",
    "bertanya", "berturut", "bertutur", "berujar", "berupa", "besar", "betul", "biasa",
    "biasanya", "bila", "bilakah", "bisa", "bisakah", "boleh", "bolehkah", "buat", "bukan",
    "bukankah", "bukanlah", "bukannya", "cara", "caranya", "cukup", "cuma", "dahulu",
    "dalam", "dan", "dapat", "dari", "daripada", "datang", "dekat", "demi", "demikian",
    "dengan", "depan", "di", "dia", "diakhiri", "dialah", "diantara", "diberi", "diberikan",
    "dibuat", "dibuatnya", "dijelaskan", "dikarenakan", "dikatakan", "dimana", "dimaksud",
    "dimulai", "dini", "dipastikan", "diri", "dirinya", "disampaikan", "disebut",
    "disebutkan", "ditambahkan", "ditanya", "ditegaskan", "ditunjuk", "diucapkan", "dong",
    "dua", "dulu", "empat", "enggak", "entah", "guna", "hal", "hampir", "hanya", "hanyalah",
    "harus", "haruslah", "hendak", "hingga", "ia", "ialah", "ibarat", "ibu", "ikut",
    "ingin", "ini", "inikah", "inilah", "itu", "itukah", "itulah", "jadi", "jadilah",
    "jangan", "jangankan", "jauh", "jawab", "jelas", "jelaslah", "jika", "jikalau", "juga",
    "jumlah", "justru", "kala", "kalau", "kalaulah", "kalaupun", "kalian", "kami",
    "kamilah", "kamu", "kamulah", "kan", "kapan", "kapankah", "kapanpun", "karena",
    "karenanya", "kata", "katakan", "katanya", "ke", "keadaan", "kebetulan", "kecil",
    "kedua", "keluar", "kembali", "kemudian", "kemungkinan", "kenapa", "kepada",
    "kepadanya", "keseluruhan", "ketika", "khususnya", "kini", "kinilah", "kira", "kita",
    "kitalah", "kok", "kurang", "lagi", "lagian", "lah", "lain", "lainnya", "lalu", "lama",
    "lamanya", "langsung", "lanjut", "lebih", "lewat", "lima", "luar", "macam", "maka",
    "makanya", "makin", "malah", "malahan", "mampu", "mana", "manakala", "masa", "masalah",
    "masih", "masing", "mau", "maupun", "melainkan", "melakukan", "melalui", "melihat",
    "memang", "memastikan", "memberi", "memberikan", "membuat", "memerlukan", "meminta",
    "mempergunakan", "memperkirakan", "memperlihatkan", "mempersiapkan", "mempunyai",
    "memulai", "memungkinkan", "menambahkan", "menandaskan", "menanti", "menanyakan",
    "mendapat", "mendapatkan", "mendatang", "menegaskan", "mengakhiri", "mengapa",
    "mengatakan", "mengatakannya", "mengenai", "mengerjakan", "mengetahui", "menggunakan",
    "menghendaki", "mengingat", "mengingatkan", "menginginkan", "mengucapkan", "menjadi",
    "menjawab", "menjelaskan", "menuju", "menunjuk", "menurut", "menuturkan",
    "menyampaikan", "menyangkut", "menyatakan", "menyebutkan", "menyeluruh", "merasa",
    "mereka", "merekalah", "merupakan", "meski", "meskipun", "misal", "misalkan",
    "misalnya", "mula", "mulai", "mungkin", "nah", "naik", "namun", "nanti", "nantinya",
    "nyaris", "oleh", "olehnya", "pada", "padahal", "padanya", "paling", "panjang", "para",
    "pasti", "pastilah", "penting", "per", "percuma", "pernah", "persoalan", "pertama",
    "pertanyaan", "pihak", "pula", "pun", "punya", "rasa", "rata", "rupanya", "saat",
    "saja", "saling", "sama", "sambil", "sampai", "sana", "sangat", "satu", "saya", "sebab",
    "sebagai", "sebagian", "sebaliknya", "sebanyak", "sebelum", "sebelumnya",
    "sebenarnya", "seberapa", "sebesar", "sebetulnya", "sebuah", "secara", "sedang",
    "sedangkan", "sedemikian", "sedikit", "segala", "segera", "sehingga", "sejak",
    "sejauh", "sejumlah", "sekadar", "sekali", "sekalian", "sekaligus", "sekarang",
    "sekitar", "sekitarnya", "sela", "selain", "selalu", "selama", "selanjutnya",
    "seluruh", "seluruhnya", "semakin", "semasa", "semata", "semua", "semuanya", "sendiri",
    "sendirinya", "seorang", "sepanjang", "seperti", "sepertinya", "sering", "seringnya",
    "serta", "sesuatu", "sesudah", "sesudahnya", "setelah", "setempat", "setiap",
    "setidaknya", "seusai", "sewaktu", "siapa", "siapakah", "siapapun", "sini", "soal",
    "sudah", "sudahlah", "supaya", "tadi", "tadinya", "tahu", "tak", "tambah", "tampak",
    "tanpa", "tanya", "tapi", "tegas", "telah", "tempat", "tengah", "tentang", "tentu",
    "tentunya", "terakhir", "terdapat", "terhadap", "terjadi", "terjadilah", "terlalu",
    "terlebih", "terlihat", "termasuk", "ternyata", "tersebut", "tertentu", "tetap",
    "tetapi", "tiap", "tidak", "tidakkah", "toh", "tunjuk", "turut", "tutur", "ucap",
    "ujar", "umum", "untuk", "usai", "waduh", "wah", "wahai", "waktu", "walau", "walaupun",
    "wong", "yaitu", "yakin", "yakni", "yang",
];

pub static NOISE: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| NOISE_WORDS.iter().copied().collect());

/// Heavy stoplist for the probabilistic model: base list plus journalistic filler.
pub static LDA_STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    INDONESIAN_BASE
        .iter()
        .chain(JOURNALISTIC_STOPWORDS.iter())
        .copied()
        .collect()
});

pub static VECTORIZER_STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| JOURNALISTIC_STOPWORDS.iter().copied().collect());

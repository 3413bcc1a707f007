/// ランダムトークン生成
///
/// 処理結果アイテムのID接頭辞などに使う固定長のランダム文字列を生成する。
use rand::Rng;
use rand::seq::SliceRandom;

/// 英小文字
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
/// 英大文字
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// 数字
const DIGITS: &[u8] = b"0123456789";
/// ASCII記号（32文字）
const PUNCTUATION: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// トークンのサンプリング対象となる文字集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<u8>,
}

impl Alphabet {
    /// 英数字（記号を含めるかどうかを指定）
    pub fn alphanumeric(punctuation: bool) -> Self {
        let mut chars = Vec::with_capacity(94);
        chars.extend_from_slice(LOWERCASE);
        chars.extend_from_slice(UPPERCASE);
        chars.extend_from_slice(DIGITS);
        if punctuation {
            chars.extend_from_slice(PUNCTUATION);
        }
        Self { chars }
    }

    /// 文字が集合に含まれるか
    pub fn contains(&self, c: char) -> bool {
        c.is_ascii() && self.chars.contains(&(c as u8))
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// 乱数源を差し替え可能なトークン生成器
///
/// テストではシード付きの`StdRng`を渡して結果を固定できる。
pub struct TokenGenerator<R: Rng> {
    rng: R,
}

impl<R: Rng> TokenGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// 指定長のトークンを生成する
    ///
    /// 各文字は文字集合から一様に、重複ありで選ばれる。
    /// `length`が0の場合は空文字列を返す。
    pub fn generate(&mut self, length: usize, punctuation: bool) -> String {
        let alphabet = Alphabet::alphanumeric(punctuation);
        (0..length)
            .filter_map(|_| alphabet.chars.choose(&mut self.rng))
            .map(|&b| b as char)
            .collect()
    }
}

/// スレッドローカル乱数でトークンを生成する
pub fn random_token(length: usize, punctuation: bool) -> String {
    TokenGenerator::new(rand::thread_rng()).generate(length, punctuation)
}

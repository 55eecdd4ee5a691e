use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Decoded page text plus the name of the encoding that produced it.
#[derive(Debug)]
pub struct DecodedPage {
    pub text: String,
    pub encoding: &'static str,
    pub had_errors: bool,
}

/// Saved pages from Korean and Chinese sites are not always UTF-8
/// (EUC-KR, GBK). BOM first, then strict UTF-8, then detection.
pub fn decode_page(bytes: &[u8]) -> DecodedPage {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return DecodedPage {
            text: text.into_owned(),
            encoding: encoding.name(),
            had_errors,
        };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedPage {
            text: text.to_string(),
            encoding: UTF_8.name(),
            had_errors: false,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, had_errors) = encoding.decode(bytes);

    DecodedPage {
        text: text.into_owned(),
        encoding: encoding.name(),
        had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("<title>서울</title>".as_bytes());
        let page = decode_page(&bytes);
        assert_eq!(page.text, "<title>서울</title>");
        assert_eq!(page.encoding, "UTF-8");
    }

    #[test]
    fn detects_euc_kr() {
        let source = "<html><body><p>그는 천천히 문을 열었다. 방 안에는 아무도 없었다. \
                      창밖으로 비가 내리고 있었다.</p></body></html>";
        let (bytes, _, _) = encoding_rs::EUC_KR.encode(source);
        let page = decode_page(&bytes);
        assert_eq!(page.text, source);
        assert!(!page.had_errors);
    }
}

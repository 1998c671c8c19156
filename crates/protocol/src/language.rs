//! Locale to USB language id mapping
//!
//! String descriptors are requested in a LANGID (USB Language Identifiers,
//! version 1.0). This table maps POSIX locale names to those ids so strings
//! come back in the user's language when the device offers it.

/// One row of the locale table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Human readable name
    pub name: &'static str,
    /// Lower-case locale code without encoding, e.g. `en_us`
    pub code: &'static str,
    /// USB LANGID
    pub usb_code: u16,
}

const fn lang(name: &'static str, code: &'static str, usb_code: u16) -> Language {
    Language { name, code, usb_code }
}

/// US English, the id nearly every device supports
pub const LANG_EN_US: u16 = 0x0409;

/// Known locales, in lookup order
///
/// Some codes appear twice (Azeri, Norwegian, Serbian, Uzbek); the first
/// entry wins.
pub const LANGUAGES: &[Language] = &[
    lang("Afrikaans", "af", 0x0436),
    lang("Albanian", "sq", 0x041c),
    lang("Arabic - United Arab Emirates", "ar_ae", 0x3801),
    lang("Arabic - Bahrain", "ar_bh", 0x3c01),
    lang("Arabic - Algeria", "ar_dz", 0x1401),
    lang("Arabic - Egypt", "ar_eg", 0x0c01),
    lang("Arabic - Iraq", "ar_iq", 0x0801),
    lang("Arabic - Jordan", "ar_jo", 0x2c01),
    lang("Arabic - Kuwait", "ar_kw", 0x3401),
    lang("Arabic - Lebanon", "ar_lb", 0x3001),
    lang("Arabic - Libya", "ar_ly", 0x1001),
    lang("Arabic - Morocco", "ar_ma", 0x1801),
    lang("Arabic - Oman", "ar_om", 0x2001),
    lang("Arabic - Qatar", "ar_qa", 0x4001),
    lang("Arabic - Saudi Arabia", "ar_sa", 0x0401),
    lang("Arabic - Syria", "ar_sy", 0x2801),
    lang("Arabic - Tunisia", "ar_tn", 0x1c01),
    lang("Arabic - Yemen", "ar_ye", 0x2401),
    lang("Armenian", "hy", 0x042b),
    lang("Azeri - Latin", "az_az", 0x042c),
    lang("Azeri - Cyrillic", "az_az", 0x082c),
    lang("Basque", "eu", 0x042d),
    lang("Belarusian", "be", 0x0423),
    lang("Bulgarian", "bg", 0x0402),
    lang("Catalan", "ca", 0x0403),
    lang("Chinese - China", "zh_cn", 0x0804),
    lang("Chinese - Hong Kong SAR", "zh_hk", 0x0c04),
    lang("Chinese - Macau SAR", "zh_mo", 0x1404),
    lang("Chinese - Singapore", "zh_sg", 0x1004),
    lang("Chinese - Taiwan", "zh_tw", 0x0404),
    lang("Croatian", "hr", 0x041a),
    lang("Czech", "cs", 0x0405),
    lang("Danish", "da", 0x0406),
    lang("Dutch - Netherlands", "nl_nl", 0x0413),
    lang("Dutch - Belgium", "nl_be", 0x0813),
    lang("English - Australia", "en_au", 0x0c09),
    lang("English - Belize", "en_bz", 0x2809),
    lang("English - Canada", "en_ca", 0x1009),
    lang("English - Caribbean", "en_cb", 0x2409),
    lang("English - Ireland", "en_ie", 0x1809),
    lang("English - Jamaica", "en_jm", 0x2009),
    lang("English - New Zealand", "en_nz", 0x1409),
    lang("English - Philippines", "en_ph", 0x3409),
    lang("English - Southern Africa", "en_za", 0x1c09),
    lang("English - Trinidad", "en_tt", 0x2c09),
    lang("English - Great Britain", "en_gb", 0x0809),
    lang("English - United States", "en_us", 0x0409),
    lang("Estonian", "et", 0x0425),
    lang("Farsi", "fa", 0x0429),
    lang("Finnish", "fi", 0x040b),
    lang("Faroese", "fo", 0x0438),
    lang("French - France", "fr_fr", 0x040c),
    lang("French - Belgium", "fr_be", 0x080c),
    lang("French - Canada", "fr_ca", 0x0c0c),
    lang("French - Luxembourg", "fr_lu", 0x140c),
    lang("French - Switzerland", "fr_ch", 0x100c),
    lang("Gaelic - Ireland", "gd_ie", 0x083c),
    lang("Gaelic - Scotland", "gd", 0x043c),
    lang("German - Germany", "de_de", 0x0407),
    lang("German - Austria", "de_at", 0x0c07),
    lang("German - Liechtenstein", "de_li", 0x1407),
    lang("German - Luxembourg", "de_lu", 0x1007),
    lang("German - Switzerland", "de_ch", 0x0807),
    lang("Greek", "el", 0x0408),
    lang("Hebrew", "he", 0x040d),
    lang("Hindi", "hi", 0x0439),
    lang("Hungarian", "hu", 0x040e),
    lang("Icelandic", "is", 0x040f),
    lang("Indonesian", "id", 0x0421),
    lang("Italian - Italy", "it_it", 0x0410),
    lang("Italian - Switzerland", "it_ch", 0x0810),
    lang("Japanese", "ja", 0x0411),
    lang("Korean", "ko", 0x0412),
    lang("Latvian", "lv", 0x0426),
    lang("Lithuanian", "lt", 0x0427),
    lang("F.Y.R.O. Macedonia", "mk", 0x042f),
    lang("Malay - Malaysia", "ms_my", 0x043e),
    lang("Malay - Brunei", "ms_bn", 0x083e),
    lang("Maltese", "mt", 0x043a),
    lang("Marathi", "mr", 0x044e),
    lang("Norwegian - Bokml", "no_no", 0x0414),
    lang("Norwegian - Nynorsk", "no_no", 0x0814),
    lang("Polish", "pl", 0x0415),
    lang("Portuguese - Portugal", "pt_pt", 0x0816),
    lang("Portuguese - Brazil", "pt_br", 0x0416),
    lang("Raeto-Romance", "rm", 0x0417),
    lang("Romanian - Romania", "ro", 0x0418),
    lang("Romanian - Republic of Moldova", "ro_mo", 0x0818),
    lang("Russian", "ru", 0x0419),
    lang("Russian - Republic of Moldova", "ru_mo", 0x0819),
    lang("Sanskrit", "sa", 0x044f),
    lang("Serbian - Cyrillic", "sr_sp", 0x0c1a),
    lang("Serbian - Latin", "sr_sp", 0x081a),
    lang("Setsuana", "tn", 0x0432),
    lang("Slovenian", "sl", 0x0424),
    lang("Slovak", "sk", 0x041b),
    lang("Sorbian", "sb", 0x042e),
    lang("Spanish - Spain (Traditional)", "es_es", 0x040a),
    lang("Spanish - Argentina", "es_ar", 0x2c0a),
    lang("Spanish - Bolivia", "es_bo", 0x400a),
    lang("Spanish - Chile", "es_cl", 0x340a),
    lang("Spanish - Colombia", "es_co", 0x240a),
    lang("Spanish - Costa Rica", "es_cr", 0x140a),
    lang("Spanish - Dominican Republic", "es_do", 0x1c0a),
    lang("Spanish - Ecuador", "es_ec", 0x300a),
    lang("Spanish - Guatemala", "es_gt", 0x100a),
    lang("Spanish - Honduras", "es_hn", 0x480a),
    lang("Spanish - Mexico", "es_mx", 0x080a),
    lang("Spanish - Nicaragua", "es_ni", 0x4c0a),
    lang("Spanish - Panama", "es_pa", 0x180a),
    lang("Spanish - Peru", "es_pe", 0x280a),
    lang("Spanish - Puerto Rico", "es_pr", 0x500a),
    lang("Spanish - Paraguay", "es_py", 0x3c0a),
    lang("Spanish - El Salvador", "es_sv", 0x440a),
    lang("Spanish - Uruguay", "es_uy", 0x380a),
    lang("Spanish - Venezuela", "es_ve", 0x200a),
    lang("Southern Sotho", "st", 0x0430),
    lang("Swahili", "sw", 0x0441),
    lang("Swedish - Sweden", "sv_se", 0x041d),
    lang("Swedish - Finland", "sv_fi", 0x081d),
    lang("Tamil", "ta", 0x0449),
    lang("Tatar", "tt", 0x0444),
    lang("Thai", "th", 0x041e),
    lang("Turkish", "tr", 0x041f),
    lang("Tsonga", "ts", 0x0431),
    lang("Ukrainian", "uk", 0x0422),
    lang("Urdu", "ur", 0x0420),
    lang("Uzbek - Cyrillic", "uz_uz", 0x0843),
    lang("Uzbek - Latin", "uz_uz", 0x0443),
    lang("Vietnamese", "vi", 0x042a),
    lang("Xhosa", "xh", 0x0434),
    lang("Yiddish", "yi", 0x043d),
    lang("Zulu", "zu", 0x0435),
];

/// LANGID for a locale string such as `de_DE.UTF-8`
///
/// The encoding suffix is ignored and matching is case-insensitive. If the
/// full `language_territory` code is unknown, a table entry for the bare
/// language (e.g. `ja` for `ja_JP`) is accepted instead.
pub fn usb_lang_for_locale(locale: &str) -> Option<u16> {
    let code = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if code.is_empty() {
        return None;
    }

    if let Some(entry) = LANGUAGES.iter().find(|l| l.code == code) {
        return Some(entry.usb_code);
    }

    let language = code.split('_').next().unwrap_or_default();
    LANGUAGES.iter().find(|l| l.code == language).map(|l| l.usb_code)
}

//! The letter-by-letter equivalence table.

/// One entry per ASCII lowercase letter. Every scalar in an entry is accepted
/// wherever a loose pattern character for that letter is accepted.
///
/// Sources:
/// - Unicode generator: <http://qaz.wtf/u/convert.cgi>
/// - Unicode identifier: <http://www.babelstone.co.uk/Unicode/whatisit.html>
static EXPANSIONS: [&str; 26] = [
    // a
    "ⓐ🅐ａ𝐚𝖆𝒂𝓪𝕒𝚊𝖺𝗮𝙖𝘢⒜🇦🄰🅰󠁡áﾑคαаል𝔞äᴀȺₐᵃɐⒶＡ𝐀𝕬𝑨𝓐𝔸𝙰𝖠𝗔𝘼𝘈󠁁ÁД𝔄Äᴬàāãάăåवâ",
    // b
    "ⓑ🅑ｂ𝐛𝖇𝒃𝓫𝕓𝚋𝖻𝗯𝙗𝘣⒝🇧🄱🅱󠁢乃๒въጌ𝔟ḅʙƀᵇⒷＢ𝐁𝕭𝑩𝓑𝔹𝙱𝖡𝗕𝘽𝘉󠁂Б𝔅ḄɃᴮ",
    // c
    "ⓒ🅒ｃ𝐜𝖈𝒄𝓬𝕔𝚌𝖼𝗰𝙘𝘤⒞🇨🄲🅲󠁣ćƈ¢ςсር𝔠ċᴄȼᶜɔↄⒸＣ𝐂𝕮𝑪𝓒ℂ𝙲𝖢𝗖𝘾𝘊󠁃ĆҀℭĊȻↃ",
    // d
    "ⓓ🅓ｄ𝐝𝖉𝒅𝓭𝕕𝚍𝖽𝗱𝙙𝘥⒟🇩🄳🅳󠁤ɗ∂๔ↁዕ𝔡ḋᴅđᵈⒹＤ𝐃𝕯𝑫𝓓𝔻𝙳𝖣𝗗𝘿𝘋󠁄𝔇ḊĐᴰ",
    // e
    "ⓔ🅔ｅ𝐞𝖊𝒆𝓮𝕖𝚎𝖾𝗲𝙚𝘦⒠🇪🄴🅴󠁥é乇ﻉєэቿ𝔢ëᴇɇₑᵉǝɘⒺＥ𝐄𝕰𝑬𝓔𝔼𝙴𝖤𝗘𝙀𝘌󠁅ÉЄ𝔈ЁɆᴱƎēĕêẽěЀ⋷⋶еĒ已∈ё",
    // f
    "ⓕ🅕ｆ𝐟𝖋𝒇𝓯𝕗𝚏𝖿𝗳𝙛𝘧⒡🇫🄵🅵󠁦ｷिƒŦቻ𝔣ḟꜰᶠɟꟻⒻＦ𝐅𝕱𝑭𝓕𝔽𝙵𝖥𝗙𝙁𝘍󠁆𝔉Ḟ",
    // g
    "ⓖ🅖ｇ𝐠𝖌𝒈𝓰𝕘𝚐𝗀𝗴𝙜𝘨⒢🇬🄶🅶󠁧ǵﻭﻮБኗ𝔤ġɢǥᵍƃⒼＧ𝐆𝕲𝑮𝓖𝔾𝙶𝖦𝗚𝙂𝘎󠁇Ǵ𝔊ĠǤᴳ",
    // h
    "ⓗ🅗ｈ𝐡𝖍𝒉𝓱𝕙𝚑𝗁𝗵𝙝𝘩⒣🇭🄷🅷󠁨んɦнђЂዘ𝔥ḧʜħₕʰɥⒽＨ𝐇𝕳𝑯𝓗ℍ𝙷𝖧𝗛𝙃𝘏󠁈НℌḦĦᴴ",
    // i
    "ⓘ🅘ｉ𝐢𝖎𝒊𝓲𝕚𝚒𝗂𝗶𝙞𝘪⒤🇮🄸🅸󠁩íﾉٱιเіጎ𝔦ïɪɨᵢⁱıⒾＩ𝐈𝕴𝑰𝓘𝕀𝙸𝖨𝗜𝙄𝘐󠁉ІℑЇƗᴵīìĪϊîĭÌĩΪİỉїⅰί",
    // j
    "ⓙ🅙ｊ𝐣𝖏𝒋𝓳𝕛𝚓𝗃𝗷𝙟𝘫⒥🇯🄹🅹󠁪ﾌﻝנןјጋ𝔧ᴊɉⱼʲɾⒿＪ𝐉𝕵𝑱𝓙𝕁𝙹𝖩𝗝𝙅𝘑󠁊Ј𝔍Ɉᴶ",
    // k
    "ⓚ🅚ｋ𝐤𝖐𝒌𝓴𝕜𝚔𝗄𝗸𝙠𝘬⒦🇰🄺🅺󠁫ḱズᛕкጕ𝔨ḳᴋꝁₖᵏʞⓀＫ𝐊𝕶𝑲𝓚𝕂𝙺𝖪𝗞𝙆𝘒󠁋ḰЌ𝔎ḲꝀᴷ",
    // l
    "ⓛ🅛ｌ𝐥𝖑𝒍𝓵𝕝𝚕𝗅𝗹𝙡𝘭⒧🇱🄻🅻󠁬ĺﾚɭℓረ𝔩ḷʟłₗˡןⓁＬ𝐋𝕷𝑳𝓛𝕃𝙻𝖫𝗟𝙇𝘓󠁌Ĺ𝔏ḶŁᴸ⅃",
    // m
    "ⓜ🅜ｍ𝐦𝖒𝒎𝓶𝕞𝚖𝗆𝗺𝙢𝘮⒨🇲🄼🅼󠁭ḿﾶ๓мጠ𝔪ṁᴍₘᵐɯⓂＭ𝐌𝕸𝑴𝓜𝕄𝙼𝖬𝗠𝙈𝘔󠁍ḾМ𝔐Ṁᴹ",
    // n
    "ⓝ🅝ｎ𝐧𝖓𝒏𝓷𝕟𝚗𝗇𝗻𝙣𝘯⒩🇳🄽🅽󠁮ń刀กηภиክ𝔫ṅɴₙⁿᴎⓃＮ𝐍𝕹𝑵𝓝ℕ𝙽𝖭𝗡𝙉𝘕󠁎ŃИ𝔑Ṅᴺ",
    // o
    "ⓞ🅞ｏ𝐨𝖔𝒐𝓸𝕠𝚘𝗈𝗼𝙤𝘰⒪🇴🄾🅾󠁯őѻσ๏оዐ𝔬öᴏøₒᵒⓄＯ𝐎𝕺𝑶𝓞𝕆𝙾𝖮𝗢𝙊𝘖󠁏ŐФ𝔒ÖØᴼŌŏōةÕõÒēŎòóૅόбÔਠ",
    // p
    "ⓟ🅟ｐ𝐩𝖕𝒑𝓹𝕡𝚙𝗉𝗽𝙥𝘱⒫🇵🄿🅿󠁰ṕｱρקрየ𝔭ṗᴩᵽₚᵖⓅＰ𝐏𝕻𝑷𝓟ℙ𝙿𝖯𝗣𝙋𝘗󠁐ṔР𝔓ṖⱣᴾꟼ",
    // q
    "ⓠ🅠ｑ𝐪𝖖𝒒𝓺𝕢𝚚𝗊𝗾𝙦𝘲⒬🇶🅀🆀󠁱۹ợዒ𝔮ꝗⓆＱ𝐐𝕼𝑸𝓠ℚ𝚀𝖰𝗤𝙌𝘘󠁑𝔔Ꝗ",
    // r
    "ⓡ🅡ｒ𝐫𝖗𝒓𝓻𝕣𝚛𝗋𝗿𝙧𝘳⒭🇷🅁🆁󠁲ŕ尺ɼягѓዪ𝔯ṛʀɍᵣʳɹᴙⓇＲ𝐑𝕽𝑹𝓡ℝ𝚁𝖱𝗥𝙍𝘙󠁒ŔЯℜṚɌᴿ",
    // s
    "ⓢ🅢ｓ𝐬𝖘𝒔𝓼𝕤𝚜𝗌𝘀𝙨𝘴⒮🇸🅂🆂󠁳ś丂รѕነ𝔰ṡꜱₛˢꙅⓈＳ𝐒𝕾𝑺𝓢𝕊𝚂𝖲𝗦𝙎𝘚󠁓Ѕ𝔖ṠꙄ",
    // t
    "ⓣ🅣ｔ𝐭𝖙𝒕𝓽𝕥𝚝𝗍𝘁𝙩𝘵⒯🇹🅃🆃󠁴ｲՇтፕ𝔱ẗᴛŧₜᵗʇⓉＴ𝐓𝕿𝑻𝓣𝕋𝚃𝖳𝗧𝙏𝘛󠁔Г𝔗ṪŦᵀ",
    // u
    "ⓤ🅤ｕ𝐮𝖚𝒖𝓾𝕦𝚞𝗎𝘂𝙪𝘶⒰🇺🅄🆄󠁵úપυยцሁ𝔲üᴜᵾᵤᵘⓊＵ𝐔𝖀𝑼𝓤𝕌𝚄𝖴𝗨𝙐𝘜󠁕ŰЦ𝔘ÜᵁūŪϋŨÙÚŬủŭύỦû",
    // v
    "ⓥ🅥ｖ𝐯𝖛𝒗𝓿𝕧𝚟𝗏𝘃𝙫𝘷⒱🇻🅅🆅󠁶√۷νשሀ𝔳ṿᴠᵥᵛʌⓋＶ𝐕𝑽𝓥𝕍𝚅𝖵𝗩𝙑𝘝󠁖Ṿⱽ𐌡",
    // w
    "ⓦ🅦ｗ𝐰𝖜𝒘𝔀𝕨𝚠𝗐𝘄𝙬𝘸⒲🇼🅆🆆󠁷ẃฝωฬшሠ𝔴ẅᴡʷʍⓌＷ𝐖𝖂𝑾𝓦𝕎𝚆𝖶𝗪𝙒𝘞󠁗ẂЩ𝔚Ẅᵂ",
    // x
    "ⓧ🅧ｘ𝐱𝖝𝒙𝔁𝕩𝚡𝗑𝘅𝙭𝘹⒳🇽🅇🆇󠁸ﾒซχאхሸ𝔵ẍₓˣⓍＸ𝐗𝖃𝑿𝓧𝕏𝚇𝖷𝗫𝙓𝘟󠁘Ж𝔛Ẍ",
    // y
    "ⓨ🅨ｙ𝐲𝖞𝒚𝔂𝕪𝚢𝗒𝘆𝙮𝘺⒴🇾🅈🆈󠁹ӳﾘץуЎሃ𝔶ÿɏʸʎⓎＹ𝐘𝖄𝒀𝓨𝕐𝚈𝖸𝗬𝙔𝘠󠁙ӲЧ𝔜ŸɎ",
    // z
    "ⓩ🅩ｚ𝐳𝖟𝒛𝔃𝕫𝚣𝗓𝘇𝙯𝘻⒵🇿🅉🆉󠁺ź乙չጊ𝔷żᴢƶᶻⓏＺ𝐙𝖅𝒁𝓩ℤ𝚉𝖹𝗭𝙕𝘡󠁚ŹℨŻƵ",
];

/// Returns the fuzzy equivalents of `ch`, or `""` for anything outside
/// `'a'..='z'`. The uppercase ASCII sibling is not in the table; callers add
/// it themselves.
pub fn fuzzy_equivalents(ch: char) -> &'static str {
    if ch.is_ascii_lowercase() {
        EXPANSIONS[(ch as u8 - b'a') as usize]
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_all_letters() {
        for ch in 'a'..='z' {
            assert!(!fuzzy_equivalents(ch).is_empty(), "no equivalents for {ch}");
        }
    }

    #[test]
    fn non_letters_are_empty() {
        for ch in ['A', 'Z', '0', '!', ' ', '\u{4e2d}'] {
            assert_eq!(fuzzy_equivalents(ch), "");
        }
    }

    #[test]
    fn spot_checks() {
        assert!(fuzzy_equivalents('c').contains('\u{24d2}')); // ⓒ
        assert!(fuzzy_equivalents('c').contains('\u{249e}')); // ⒞
        assert!(fuzzy_equivalents('a').contains('\u{03b1}')); // α
        assert!(fuzzy_equivalents('o').contains('\u{03c3}')); // σ
        assert!(fuzzy_equivalents('b').contains('\u{0432}')); // в
    }

    #[test]
    fn entries_hold_no_ascii_lowercase() {
        // The base letter itself is implicit; the table only stores variants.
        for ch in 'a'..='z' {
            assert!(
                !fuzzy_equivalents(ch).chars().any(|e| e == ch),
                "table entry for {ch} repeats the base letter"
            );
        }
    }
}

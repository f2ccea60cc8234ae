//! Bundled sentences: the always-available second tier and the first-run seed.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tokio_util::sync::CancellationToken;

use super::{
    stamp::{BatchStamp, SentenceDraft},
    ContentProvider,
};
use crate::{db::SentenceRecord, errors::SourceError};

pub const CURATED_TAG: &str = "curated";
pub const SEED_TAG: &str = "seed";

const CURATED_SENTENCES: &[(&str, &str, &str)] = &[
    ("你今天过得怎么样？", "nǐ jīntiān guò de zěnmeyàng?", "How was your day today?"),
    ("我想喝一杯咖啡。", "wǒ xiǎng hē yì bēi kāfēi.", "I'd like a cup of coffee."),
    ("这个多少钱？", "zhège duōshao qián?", "How much is this?"),
    ("请再说一遍。", "qǐng zài shuō yí biàn.", "Please say that again."),
    ("我们明天见。", "wǒmen míngtiān jiàn.", "See you tomorrow."),
    ("地铁站在哪里？", "dìtiě zhàn zài nǎlǐ?", "Where is the subway station?"),
    ("我正在学习中文。", "wǒ zhèngzài xuéxí zhōngwén.", "I am learning Chinese."),
    ("今天天气很好。", "jīntiān tiānqì hěn hǎo.", "The weather is nice today."),
    ("你能帮我一下吗？", "nǐ néng bāng wǒ yíxià ma?", "Could you help me for a moment?"),
    ("我有点儿累了。", "wǒ yǒudiǎnr lèi le.", "I'm a little tired."),
    ("周末你打算做什么？", "zhōumò nǐ dǎsuàn zuò shénme?", "What are you planning to do this weekend?"),
    ("这道菜太辣了。", "zhè dào cài tài là le.", "This dish is too spicy."),
    ("我迷路了。", "wǒ mílù le.", "I'm lost."),
    ("你会说英语吗？", "nǐ huì shuō yīngyǔ ma?", "Do you speak English?"),
    ("我已经吃过饭了。", "wǒ yǐjīng chī guò fàn le.", "I have already eaten."),
    ("慢慢来，不着急。", "mànmàn lái, bù zháojí.", "Take your time, no rush."),
    ("这本书很有意思。", "zhè běn shū hěn yǒu yìsi.", "This book is very interesting."),
    ("我们一起去吧。", "wǒmen yìqǐ qù ba.", "Let's go together."),
    ("你住在哪儿？", "nǐ zhù zài nǎr?", "Where do you live?"),
    ("我听不懂。", "wǒ tīng bu dǒng.", "I don't understand what I'm hearing."),
    ("请给我菜单。", "qǐng gěi wǒ càidān.", "Please give me the menu."),
    ("他比我高一点儿。", "tā bǐ wǒ gāo yìdiǎnr.", "He is a bit taller than me."),
    ("我明天要早起。", "wǒ míngtiān yào zǎo qǐ.", "I have to get up early tomorrow."),
    ("生日快乐！", "shēngrì kuàilè!", "Happy birthday!"),
];

const SEED_SENTENCES: &[(&str, &str, &str)] = &[
    ("你好！", "nǐ hǎo!", "Hello!"),
    ("谢谢你。", "xièxie nǐ.", "Thank you."),
    ("我叫小明。", "wǒ jiào Xiǎo Míng.", "My name is Xiao Ming."),
    ("很高兴认识你。", "hěn gāoxìng rènshi nǐ.", "Nice to meet you."),
    ("再见！", "zàijiàn!", "Goodbye!"),
];

/// Fixed first-run batch used when no content tier is reachable.
pub fn seed_batch(pack_date: NaiveDate) -> Vec<SentenceRecord> {
    let drafts = SEED_SENTENCES
        .iter()
        .map(|(hanzi, pinyin, english)| SentenceDraft::new(hanzi, pinyin, english))
        .collect();
    BatchStamp::next(SEED_TAG).apply(drafts, pack_date)
}

/// Random subset of the bundled sentence set. Never fails.
pub struct CuratedProvider {
    rng: Mutex<StdRng>,
}

impl CuratedProvider {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn pool_size() -> usize {
        CURATED_SENTENCES.len()
    }

    fn pick(&self, count: usize) -> Vec<SentenceDraft> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        CURATED_SENTENCES
            .choose_multiple(&mut *rng, count)
            .map(|(hanzi, pinyin, english)| SentenceDraft::new(hanzi, pinyin, english))
            .collect()
    }
}

impl Default for CuratedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentProvider for CuratedProvider {
    fn tag(&self) -> &'static str {
        CURATED_TAG
    }

    async fn generate(
        &self,
        count: usize,
        date: NaiveDate,
        _cancel: &CancellationToken,
    ) -> Result<Vec<SentenceRecord>, SourceError> {
        let picked = self.pick(count);
        Ok(BatchStamp::next(CURATED_TAG).apply(picked, date))
    }
}
